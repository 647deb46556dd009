//! Error types for kit sessions

use thiserror::Error;

/// Errors from kit setup and programmer selection
#[derive(Debug, Error)]
pub enum Error {
    /// Registry or programming error
    #[error(transparent)]
    Core(#[from] kitcommander_core::Error),

    /// Serial link or firmware error
    #[error(transparent)]
    Serial(#[from] kitcommander_serial::Error),

    /// The programmer name is not known (or its backend is not compiled in)
    #[error("unknown programmer: {0}")]
    UnknownProgrammer(String),

    /// Malformed programmer string
    #[error("invalid programmer parameter: {0}")]
    InvalidParameter(String),

    /// The kit exposes no usable serial port
    #[error("no accessible serial port for kit {0}")]
    NoSerialPort(String),

    /// The application gives no protocol to talk to it
    #[error("no protocol information for '{0}'")]
    NoProtocol(String),
}

/// Result type for kit operations
pub type Result<T> = std::result::Result<T, Error>;
