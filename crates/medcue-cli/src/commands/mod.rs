pub mod config;
pub mod fire;
pub mod reminder;
pub mod run;
