//! Core error types for medcue-core.
//!
//! This module defines the error hierarchy using thiserror. The taxonomy
//! follows the delivery pipeline: scheduling errors are skipped and logged,
//! generation errors are always recovered via the offline fallback, cue
//! playback errors skip straight to speech, and speech errors are terminal
//! for the firing that hit them.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Core error type for medcue-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Reminder store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Alarm dispatch errors
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Message generation errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Delivery errors
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Reminder store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the reminder store
    #[error("Failed to open reminder store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to resolve the application data directory
    #[error("Failed to resolve data directory: {0}")]
    DataDir(#[from] std::io::Error),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::QueryFailed(err.to_string())
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The active window's end date precedes its start date
    #[error("Invalid active window: end date ({end}) is before start date ({start})")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Invalid field value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Alarm dispatcher errors.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Arming a registration failed
    #[error("Failed to arm alarm '{key}': {message}")]
    ArmFailed { key: String, message: String },

    /// The dispatcher's registration map is unusable
    #[error("Dispatcher registry lock poisoned")]
    LockPoisoned,
}

/// Message generation errors. All of these are recovered locally via the
/// deterministic fallback message and never reach the patient as an error.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Transport failure or timeout on the outbound call
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The generation service answered with a non-success status
    #[error("Generation service returned HTTP {0}")]
    HttpStatus(u16),

    /// The response body did not match the expected envelope
    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),

    /// The response parsed but carried no usable message text
    #[error("Generation response contained no message text")]
    EmptyMessage,
}

/// Audio cue playback errors. Non-fatal: the pipeline skips straight to
/// message resolution and speech.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The cue asset could not be loaded or played
    #[error("Audio cue unavailable: {0}")]
    Unavailable(String),
}

/// Speech output errors. Terminal for the firing that hit them; there is no
/// secondary delivery channel.
#[derive(Error, Debug)]
pub enum SpeechError {
    /// The speech engine failed to initialize
    #[error("Speech engine initialization failed: {0}")]
    InitFailed(String),

    /// Speaking the resolved message failed
    #[error("Speech output failed for utterance '{utterance_id}': {message}")]
    OutputFailed {
        utterance_id: String,
        message: String,
    },
}

/// Delivery pipeline errors.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Speech output failed; the firing ends without a second attempt
    #[error("Speech output failed: {0}")]
    Speech(#[from] SpeechError),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
