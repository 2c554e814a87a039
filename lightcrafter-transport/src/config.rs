//! Transport configuration
//!
//! Timeouts and size bounds for a session, loadable from TOML:
//!
//! ```toml
//! read_timeout_ms = 2000
//! chunk_size = 256
//! ```
//!
//! Missing keys fall back to the defaults. Addresses are not part of the
//! configuration; callers pass them to `TcpTransport::connect`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::protocol::{timing, MAX_PAYLOAD_SIZE, MAX_RESPONSE_SIZE, MIN_FRAME_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_ms: u64,
    /// How long to wait for a response frame
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Receive bound for one response frame
    pub max_response_size: usize,
    /// Payload bytes per fragment for image and pattern transfers
    pub chunk_size: usize,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: timing::DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: timing::DEFAULT_READ_TIMEOUT_MS,
            write_timeout_ms: timing::DEFAULT_WRITE_TIMEOUT_MS,
            max_response_size: MAX_RESPONSE_SIZE,
            chunk_size: MAX_PAYLOAD_SIZE,
            nodelay: true,
        }
    }
}

impl TransportConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, TransportError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TransportError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, TransportError> {
        let config: TransportConfig = toml::from_str(content)
            .map_err(|e| TransportError::Config(format!("parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TransportError> {
        if self.connect_timeout_ms == 0 || self.read_timeout_ms == 0 || self.write_timeout_ms == 0
        {
            return Err(TransportError::Config("timeouts must be non-zero".into()));
        }
        if self.chunk_size == 0 || self.chunk_size > MAX_PAYLOAD_SIZE {
            return Err(TransportError::Config(format!(
                "chunk_size {} out of range (1..={MAX_PAYLOAD_SIZE})",
                self.chunk_size
            )));
        }
        if self.max_response_size < MIN_FRAME_SIZE {
            return Err(TransportError::Config(format!(
                "max_response_size {} smaller than a bare frame ({MIN_FRAME_SIZE})",
                self.max_response_size
            )));
        }
        Ok(())
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
