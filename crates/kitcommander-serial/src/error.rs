//! Error types for firmware communication

use thiserror::Error;

use crate::status::FirmwareStatus;

/// Firmware communication errors
#[derive(Debug, Error)]
pub enum Error {
    /// No complete response arrived before the deadline
    #[error("Timeout waiting for response to '{command}'")]
    Timeout {
        /// Command line that was sent
        command: String,
    },

    /// The firmware answered with an error status
    #[error("Command '{command}' failed: {status}")]
    FirmwareReported {
        /// Command line that was sent
        command: String,
        /// Decoded status line
        status: FirmwareStatus,
    },

    /// Ping/pong synchronization with the firmware CLI failed
    #[error("Synchronization with target CLI failed: retries: {retries} last response: {last_response:?}")]
    SyncFailed {
        /// Number of pings re-sent
        retries: u32,
        /// Lines of the last response received
        last_response: Vec<String>,
    },

    /// A command or argument cannot be framed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Result type for firmware communication
pub type Result<T> = core::result::Result<T, Error>;
