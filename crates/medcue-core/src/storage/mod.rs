mod config;
pub mod reminder_db;

pub use config::{Config, DeliveryConfig, GeneratorConfig};
pub use reminder_db::ReminderDb;

use std::path::PathBuf;

/// Returns `~/.config/medcue[-dev]/` based on MEDCUE_ENV.
///
/// Set MEDCUE_ENV=dev to use a development data directory, or
/// MEDCUE_DATA_DIR to point at an explicit directory (tests use this for
/// isolated per-test state).
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    if let Ok(dir) = std::env::var("MEDCUE_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MEDCUE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("medcue-dev")
    } else {
        base_dir.join("medcue")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
