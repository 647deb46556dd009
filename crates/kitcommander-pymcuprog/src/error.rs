//! Error types for the pymcuprog backend

use thiserror::Error;

/// pymcuprog backend errors
#[derive(Debug, Error)]
pub enum PymcuprogError {
    /// The external tool is not installed or not on PATH
    #[error("'{0}' not found, is it installed and on PATH?")]
    ToolNotFound(String),

    /// The external tool could not be started
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The external tool exited with an error
    #[error("'{command}' failed ({status}): {message}")]
    ToolFailed {
        /// Command line that failed
        command: String,
        /// Exit status description
        status: String,
        /// Last line of the tool's error output
        message: String,
    },

    /// Tool output could not be interpreted
    #[error("unexpected output from {tool}: {reason}")]
    Parse {
        /// Tool that produced the output
        tool: String,
        /// What was wrong
        reason: String,
    },

    /// The debugger has no configured target device
    #[error("debugger {0} reports no target device")]
    NoDevice(String),

    /// Serial port enumeration failed
    #[error("USB enumeration failed: {0}")]
    Enumeration(#[from] serialport::Error),
}

impl From<PymcuprogError> for kitcommander_core::Error {
    fn from(e: PymcuprogError) -> Self {
        match e {
            PymcuprogError::ToolNotFound(_) | PymcuprogError::Spawn { .. } => {
                kitcommander_core::Error::ToolError(e.to_string())
            }
            _ => kitcommander_core::Error::ProgrammingFailed(e.to_string()),
        }
    }
}

/// Result type for pymcuprog operations
pub type Result<T> = std::result::Result<T, PymcuprogError>;
