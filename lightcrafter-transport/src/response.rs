//! Response frame interpretation
//!
//! Byte 0 of every response says whether the command ran: `0x00` busy,
//! `0x01` error (reason code in byte 6), anything else success. What the
//! success payload means depends on which command was sent, so the named
//! decoders below are picked by the caller.

use std::fmt;

use crate::protocol::{
    verify_checksum, CHECKSUM_SIZE, HEADER_SIZE, MIN_FRAME_SIZE, PAYLOAD_OFFSET,
};
use crate::types::{ContinuationFlag, DisplayMode, DisplaySetting, PacketType};

/// Device-reported failure reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ExecutionFailed,
    InvalidCommand,
    InvalidParameter,
    OutOfMemory,
    HardwareFailure,
    HardwareBusy,
    NotInitialized,
    ObjectNotFound,
    ChecksumError,
    PacketFormatError,
    ContinuationError,
    Unknown(u8),
}

impl ErrorCode {
    pub fn from_u8(code: u8) -> Self {
        match code {
            1 => Self::ExecutionFailed,
            2 => Self::InvalidCommand,
            3 => Self::InvalidParameter,
            4 => Self::OutOfMemory,
            5 => Self::HardwareFailure,
            6 => Self::HardwareBusy,
            7 => Self::NotInitialized,
            8 => Self::ObjectNotFound,
            9 => Self::ChecksumError,
            10 => Self::PacketFormatError,
            11 => Self::ContinuationError,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::ExecutionFailed => 1,
            Self::InvalidCommand => 2,
            Self::InvalidParameter => 3,
            Self::OutOfMemory => 4,
            Self::HardwareFailure => 5,
            Self::HardwareBusy => 6,
            Self::NotInitialized => 7,
            Self::ObjectNotFound => 8,
            Self::ChecksumError => 9,
            Self::PacketFormatError => 10,
            Self::ContinuationError => 11,
            Self::Unknown(code) => *code,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ExecutionFailed => "Command execution failed with unknown error",
            Self::InvalidCommand => "Invalid command",
            Self::InvalidParameter => "Invalid Parameter",
            Self::OutOfMemory => "Out of memory resource",
            Self::HardwareFailure => "Hardware device failure",
            Self::HardwareBusy => "Hardware busy",
            Self::NotInitialized => {
                "Not Initialized (any of the preconditions for the command is not met)"
            }
            Self::ObjectNotFound => {
                "Some object referred by the command is not found. \
                 For example, a solution name was not found"
            }
            Self::ChecksumError => "Checksum Error.",
            Self::PacketFormatError => {
                "Packet format error due to insufficient or larger than expected payload size"
            }
            Self::ContinuationError => {
                "Command continuation error due to incorrect continuation flag"
            }
            Self::Unknown(_) => "Unknown error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Human-readable reason for a device error code
pub fn decode_error(code: u8) -> &'static str {
    ErrorCode::from_u8(code).description()
}

/// Outcome reported in byte 0 of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Device could not take the command; the caller decides whether to resend
    Busy,
    Error(ErrorCode),
    Success,
}

/// Parse error for responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    TooShort { expected: usize, got: usize },
    InvalidValue { field: &'static str, value: u8 },
    InvalidText,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { expected, got } => {
                write!(
                    f,
                    "Response too short: expected {} bytes, got {}",
                    expected, got
                )
            }
            Self::InvalidValue { field, value } => {
                write!(f, "Invalid value for {}: 0x{:02X}", field, value)
            }
            Self::InvalidText => f.write_str("Response text is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ParseError {}

/// One response frame as read from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    bytes: Vec<u8>,
}

impl ResponseFrame {
    /// Minimum length of an error frame: header plus error code
    pub const MIN_ERROR_LEN: usize = PAYLOAD_OFFSET + 1;

    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Self, ParseError> {
        let bytes = bytes.into();
        let Some(&status) = bytes.first() else {
            return Err(ParseError::TooShort {
                expected: 1,
                got: 0,
            });
        };
        if status == PacketType::Error as u8 && bytes.len() < Self::MIN_ERROR_LEN {
            return Err(ParseError::TooShort {
                expected: Self::MIN_ERROR_LEN,
                got: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    pub fn status(&self) -> Status {
        match self.bytes[0] {
            0x00 => Status::Busy,
            // length checked in parse()
            0x01 => Status::Error(ErrorCode::from_u8(self.bytes[PAYLOAD_OFFSET])),
            _ => Status::Success,
        }
    }

    /// Raw status byte
    pub fn raw_status(&self) -> u8 {
        self.bytes[0]
    }

    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_u8(self.bytes[0])
    }

    /// Echoed command id
    pub fn command(&self) -> Option<u16> {
        match self.bytes.get(1..3) {
            Some(&[cmd1, cmd2]) => Some(u16::from_be_bytes([cmd1, cmd2])),
            _ => None,
        }
    }

    pub fn flag(&self) -> Option<ContinuationFlag> {
        self.bytes.get(3).copied().and_then(ContinuationFlag::from_u8)
    }

    /// Payload length announced in the header
    pub fn declared_length(&self) -> Option<u16> {
        match self.bytes.get(4..HEADER_SIZE) {
            Some(&[lsb, msb]) => Some(u16::from_le_bytes([lsb, msb])),
            _ => None,
        }
    }

    /// Bytes between the header and the trailing checksum
    pub fn payload(&self) -> &[u8] {
        let end = self.bytes.len().saturating_sub(1);
        self.bytes.get(PAYLOAD_OFFSET..end).unwrap_or(&[])
    }

    /// Payload byte at `index` (frame offset `6 + index`), or `TooShort`
    pub fn payload_byte(&self, index: usize) -> Result<u8, ParseError> {
        self.payload()
            .get(index)
            .copied()
            .ok_or(ParseError::TooShort {
                expected: PAYLOAD_OFFSET + index + 1 + CHECKSUM_SIZE,
                got: self.bytes.len(),
            })
    }

    pub fn checksum_valid(&self) -> bool {
        verify_checksum(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    // === Decoders ===

    /// Display mode query answer (byte 6)
    pub fn display_mode(&self) -> Result<DisplayMode, ParseError> {
        let value = self.payload_byte(0)?;
        DisplayMode::from_u8(value).ok_or(ParseError::InvalidValue {
            field: "display mode",
            value,
        })
    }

    /// Revision query answer (bytes 6 up to the checksum, as text)
    pub fn revision(&self) -> Result<String, ParseError> {
        if self.bytes.len() < MIN_FRAME_SIZE {
            return Err(ParseError::TooShort {
                expected: MIN_FRAME_SIZE,
                got: self.bytes.len(),
            });
        }
        let text = std::str::from_utf8(self.payload()).map_err(|_| ParseError::InvalidText)?;
        Ok(text.trim_end_matches('\0').trim().to_string())
    }

    /// Display setting query answer (bytes 6..=8)
    pub fn display_setting(&self) -> Result<DisplaySetting, ParseError> {
        let flag = |index: usize, field: &'static str| -> Result<bool, ParseError> {
            match self.payload_byte(index)? {
                0 => Ok(false),
                1 => Ok(true),
                value => Err(ParseError::InvalidValue { field, value }),
            }
        };
        Ok(DisplaySetting {
            flip_x: flag(0, "flip X")?,
            flip_y: flag(1, "flip Y")?,
            rotate: flag(2, "rotate")?,
        })
    }
}
