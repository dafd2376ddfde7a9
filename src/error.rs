//! # Error Types
//!
//! Custom error types for the BMS CAN monitor using `thiserror`.
//!
//! The frame decoder itself never fails; these errors come from the
//! surrounding layers (adapter codec, serial port, configuration).

use thiserror::Error;

/// Main error type for the BMS CAN monitor
#[derive(Debug, Error)]
pub enum BmsError {
    /// Malformed SLCAN record from the adapter
    #[error("SLCAN record error: {0}")]
    Slcan(String),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// No usable serial device among the candidates
    #[error("No CAN adapter found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the BMS CAN monitor
pub type Result<T> = std::result::Result<T, BmsError>;
