//! Error types for kitcommander-core

use thiserror::Error;

/// Core error type shared by the registry and programmer backends
#[derive(Debug, Error)]
pub enum Error {
    /// No registry entry matches the kit name
    #[error("kit not supported: '{0}'")]
    KitNotSupported(String),

    /// The kit has no firmware registered for the requested function
    #[error("no firmware for '{function}' on kit '{kit}'")]
    FirmwareNotAvailable {
        /// Kit identifier
        kit: String,
        /// Requested firmware function
        function: String,
    },

    /// The programming backend reported a failure
    #[error("programming failed: {0}")]
    ProgrammingFailed(String),

    /// No usable kit is connected
    #[error("kit not found")]
    NoKitFound,

    /// Several usable kits are connected and none was selected
    #[error("too many kits available ({0}), a USB serial number is required")]
    TooManyKits(usize),

    /// The external tool could not be used
    #[error("tool error: {0}")]
    ToolError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
