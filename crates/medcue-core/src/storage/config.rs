//! TOML-based application configuration.
//!
//! Stores the generation endpoint and key plus delivery preferences,
//! including the patient's alarm language. Configuration lives at
//! `~/.config/medcue/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, CoreError};
use crate::orchestrator::PreferenceSource;

/// Generation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Full generateContent endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
        }
    }
}

/// Delivery preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Alarm language code: "en", "ml", or "hi". Unknown codes fall back
    /// to English at resolution time.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Configuration file path inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/medcue"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Persist the configuration.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::SaveFailed {
            path: PathBuf::from("~/.config/medcue"),
            message: e.to_string(),
        })?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }
}

impl PreferenceSource for Config {
    fn alarm_language(&self) -> Result<String, CoreError> {
        Ok(self.delivery.language.clone())
    }
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        .to_string()
}

fn default_language() -> String {
    "en".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.delivery.language, "en");
        assert!(config.generator.endpoint.contains("generateContent"));
        assert!(config.generator.api_key.is_empty());
    }

    #[test]
    fn partial_toml_fills_in_missing_sections() {
        let config: Config = toml::from_str("[delivery]\nlanguage = \"ml\"\n").unwrap();
        assert_eq!(config.delivery.language, "ml");
        assert!(config.generator.api_key.is_empty());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = Config::default();
        config.generator.api_key = "secret".to_string();
        config.delivery.language = "hi".to_string();

        let raw = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.generator.api_key, "secret");
        assert_eq!(parsed.delivery.language, "hi");
    }

    #[test]
    fn config_acts_as_a_preference_source() {
        let mut config = Config::default();
        config.delivery.language = "ml".to_string();
        assert_eq!(config.alarm_language().unwrap(), "ml");
    }
}
