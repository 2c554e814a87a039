//! Projector session error types

use std::path::PathBuf;

use lightcrafter_transport::protocol::cmd;
use lightcrafter_transport::{
    ErrorCode, FrameError, ParseError, SettingsError, TransportError,
};
use thiserror::Error;

/// Errors from projector operations
#[derive(Error, Debug)]
pub enum ProjectorError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Device answered busy; the command was not executed
    #[error("Device busy, {} (0x{command:04x}) not accepted", cmd::name(*.command))]
    Busy { command: u16 },

    /// Device rejected the command
    #[error("{} (0x{command:04x}) failed: {code} (code {})", cmd::name(*.command), .code.code())]
    Device { command: u16, code: ErrorCode },

    /// Success frame that could not be decoded
    #[error("Malformed response: {0}")]
    Protocol(#[from] ParseError),

    /// Device returned unexpected response
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),

    /// Image file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<SettingsError> for ProjectorError {
    fn from(err: SettingsError) -> Self {
        Self::InvalidParameter(err.to_string())
    }
}

impl ProjectorError {
    /// Device-reported error code, if any
    pub fn device_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Device { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}
