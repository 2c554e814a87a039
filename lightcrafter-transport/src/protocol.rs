//! Protocol constants and packet framing for the LightCrafter DM365
//!
//! Every frame, in both directions, has the same layout:
//!
//! ```text
//! [type] [CMD1] [CMD2] [flag] [len LSB] [len MSB] [payload...] [checksum]
//! ```
//!
//! The checksum is the sum of all preceding bytes, modulo 256.

use crate::error::FrameError;
use crate::types::{ContinuationFlag, PacketType};

/// Header size: type, CMD1, CMD2, flag, length LSB, length MSB
pub const HEADER_SIZE: usize = 6;
/// Trailing checksum byte
pub const CHECKSUM_SIZE: usize = 1;
/// Offset of the first payload byte (the error code in error frames)
pub const PAYLOAD_OFFSET: usize = HEADER_SIZE;
/// Maximum payload bytes carried by one frame
pub const MAX_PAYLOAD_SIZE: usize = 512;
/// Largest frame the host sends
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CHECKSUM_SIZE;
/// Header plus checksum, no payload
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;
/// Default receive bound for a single response frame
pub const MAX_RESPONSE_SIZE: usize = 1024;

/// Command ids (`CMD1 << 8 | CMD2`)
pub mod cmd {
    // System / display (CMD1 = 0x01)
    pub const VERSION: u16 = 0x0100;
    pub const DISPLAY_MODE: u16 = 0x0101;
    pub const TEST_PATTERN: u16 = 0x0103;
    pub const STATIC_IMAGE: u16 = 0x0105;
    pub const DISPLAY_SETTING: u16 = 0x0107;

    // Pattern sequence (CMD1 = 0x04)
    pub const PATTERN_SEQ_SETTING: u16 = 0x0400;
    pub const PATTERN_DEFINITION: u16 = 0x0401;
    pub const PATTERN_SEQ_START: u16 = 0x0402;
    /// Requires DM365 firmware 3.0 or later
    pub const PATTERN_DISPLAY: u16 = 0x0405;

    /// Get human-readable name for command id
    pub fn name(cmd: u16) -> &'static str {
        match cmd {
            VERSION => "VERSION",
            DISPLAY_MODE => "DISPLAY_MODE",
            TEST_PATTERN => "TEST_PATTERN",
            STATIC_IMAGE => "STATIC_IMAGE",
            DISPLAY_SETTING => "DISPLAY_SETTING",
            PATTERN_SEQ_SETTING => "PATTERN_SEQ_SETTING",
            PATTERN_DEFINITION => "PATTERN_DEFINITION",
            PATTERN_SEQ_START => "PATTERN_SEQ_START",
            PATTERN_DISPLAY => "PATTERN_DISPLAY",
            _ => "UNKNOWN",
        }
    }
}

/// Device identification constants
pub mod device {
    /// TCP port the DM365 listens on
    pub const DEFAULT_PORT: u16 = 21845;
}

/// Timing defaults
pub mod timing {
    /// TCP connect timeout (ms)
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;
    /// Wait for a response frame (ms)
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5000;
    /// Wait for the socket to accept a frame (ms)
    pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5000;
}

/// Sum of `bytes`, modulo 256
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Check that the last byte of `frame` is the checksum of everything before it
pub fn verify_checksum(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&last, rest)) => checksum(rest) == last,
        None => false,
    }
}

/// Concatenate header and payload and append the checksum.
///
/// The header must already describe the payload: length and flag fields are
/// taken as given.
pub fn build_packet(header: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(header.len() + payload.len() + CHECKSUM_SIZE);
    buf.extend_from_slice(header);
    buf.extend_from_slice(payload);
    buf.push(checksum(&buf));
    buf
}

/// Frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_type: PacketType,
    /// `CMD1 << 8 | CMD2`
    pub command: u16,
    pub flag: ContinuationFlag,
    /// Payload length in bytes
    pub length: u16,
}

impl PacketHeader {
    /// Header for a single-frame packet with an empty payload
    pub fn new(packet_type: PacketType, command: u16) -> Self {
        Self {
            packet_type,
            command,
            flag: ContinuationFlag::Single,
            length: 0,
        }
    }

    pub fn with_flag(mut self, flag: ContinuationFlag) -> Self {
        self.flag = flag;
        self
    }

    pub fn with_length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let [cmd1, cmd2] = self.command.to_be_bytes();
        let [len_lsb, len_msb] = self.length.to_le_bytes();
        [
            self.packet_type as u8,
            cmd1,
            cmd2,
            self.flag as u8,
            len_lsb,
            len_msb,
        ]
    }
}

/// Build a single-frame packet, filling in length and flag.
pub fn encode_single(header: PacketHeader, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }
    let header = header
        .with_flag(ContinuationFlag::Single)
        .with_length(payload.len() as u16);
    Ok(build_packet(&header.to_bytes(), payload))
}
