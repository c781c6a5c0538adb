//! # Error Types
//!
//! Custom error types for Telemux using `thiserror`.

use thiserror::Error;

/// Main error type for Telemux
#[derive(Debug, Error)]
pub enum TelemuxError {
    /// Slot table layout errors (fatal misconfiguration, detected at startup)
    #[error("Slot configuration error: {0}")]
    SlotConfig(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// No serial device found at any of the candidate paths
    #[error("No serial device found at: {0}")]
    SerialPortNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Telemux
pub type Result<T> = std::result::Result<T, TelemuxError>;
