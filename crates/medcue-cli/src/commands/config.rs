//! Configuration commands.

use clap::Subcommand;
use medcue_core::{Config, Language};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key: generator.endpoint, generator.api_key, delivery.language
        key: String,
        /// New value
        value: String,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("generator.endpoint = {}", config.generator.endpoint);
            println!(
                "generator.api_key = {}",
                if config.generator.api_key.is_empty() {
                    "(unset)"
                } else {
                    "(set)"
                }
            );
            println!(
                "delivery.language = {} ({})",
                config.delivery.language,
                Language::from_code(&config.delivery.language).display_name()
            );
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            match key.as_str() {
                "generator.endpoint" => config.generator.endpoint = value,
                "generator.api_key" => config.generator.api_key = value,
                "delivery.language" => {
                    let language = Language::from_code(&value);
                    config.delivery.language = language.code().to_string();
                    println!("Alarm language: {}", language.display_name());
                }
                _ => {
                    eprintln!("unknown key: {key}");
                    return Ok(());
                }
            }
            config.save()?;
            println!("Saved.");
        }
    }
    Ok(())
}
