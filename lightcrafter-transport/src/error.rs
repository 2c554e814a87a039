//! Transport error types

use std::io;

use thiserror::Error;

use crate::response::ParseError;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Connection closed by device")]
    Disconnected,

    #[error("Communication timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("Malformed response: {0}")]
    Protocol(#[from] ParseError),

    /// Frames larger than the receive buffer are not supported; the
    /// connection is shut down because the stream is no longer aligned.
    #[error("Response of {declared} bytes exceeds the {limit}-byte receive buffer")]
    ResponseTooLarge { declared: usize, limit: usize },

    #[error("Invalid packet: {0}")]
    Frame(#[from] FrameError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected => TransportError::Disconnected,
            _ => TransportError::Io(e),
        }
    }
}

/// Errors building outgoing frames
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload of {len} bytes exceeds the {max}-byte frame limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("chunk size {size} out of range (1..={max})")]
    InvalidChunkSize { size: usize, max: usize },
}
