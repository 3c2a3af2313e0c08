//! Error types for Board Sampler

use std::io;
use thiserror::Error;

/// Result type alias for sampler operations
pub type Result<T> = std::result::Result<T, SamplerError>;

/// Errors raised while probing, reading or driving sensors
#[derive(Error, Debug)]
pub enum SamplerError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// System call error (ioctl, clocks, signals)
    #[cfg(unix)]
    #[error("System error: {0}")]
    Nix(#[from] nix::Error),

    /// USB HID error
    #[cfg(all(target_os = "linux", feature = "smartpower"))]
    #[error("USB HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Unexpected or malformed device response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
