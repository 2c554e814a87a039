//! Common types for the packet layer

use std::fmt;

/// Packet type (byte 0 of every frame)
///
/// Hosts send `Read`/`Write`; the device answers with one of the other four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Device is busy, command was not executed
    Busy = 0x00,
    /// Command failed, error code follows in byte 6
    Error = 0x01,
    /// Host write command
    Write = 0x02,
    /// Device answer to a write command
    WriteResponse = 0x03,
    /// Host read command
    Read = 0x04,
    /// Device answer to a read command
    ReadResponse = 0x05,
}

impl PacketType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Busy),
            0x01 => Some(Self::Error),
            0x02 => Some(Self::Write),
            0x03 => Some(Self::WriteResponse),
            0x04 => Some(Self::Read),
            0x05 => Some(Self::ReadResponse),
            _ => None,
        }
    }
}

/// Position of a frame within a logical transfer (byte 3 of the header)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ContinuationFlag {
    /// Whole transfer fits in this frame
    #[default]
    Single = 0x00,
    First = 0x01,
    Middle = 0x02,
    Last = 0x03,
}

impl ContinuationFlag {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Single),
            0x01 => Some(Self::First),
            0x02 => Some(Self::Middle),
            0x03 => Some(Self::Last),
            _ => None,
        }
    }

    /// Flag for frame `index` of a transfer split into `total` frames
    pub fn for_position(index: usize, total: usize) -> Self {
        if total <= 1 {
            Self::Single
        } else if index == 0 {
            Self::First
        } else if index + 1 >= total {
            Self::Last
        } else {
            Self::Middle
        }
    }

    /// True for the frame that opens a transfer
    pub fn opens_transfer(&self) -> bool {
        matches!(self, Self::Single | Self::First)
    }

    /// True for the frame that completes a transfer
    pub fn closes_transfer(&self) -> bool {
        matches!(self, Self::Single | Self::Last)
    }
}

/// Display mode of the DM365
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DisplayMode {
    StaticImage = 0,
    InternalTestPattern = 1,
    HdmiVideo = 2,
    /// Listed by the device but not used
    Reserved = 3,
    PatternSequence = 4,
}

impl DisplayMode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::StaticImage),
            1 => Some(Self::InternalTestPattern),
            2 => Some(Self::HdmiVideo),
            3 => Some(Self::Reserved),
            4 => Some(Self::PatternSequence),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StaticImage => "Static Image",
            Self::InternalTestPattern => "Internal Test Pattern",
            Self::HdmiVideo => "HDMI Video Input",
            Self::Reserved => "Reserved",
            Self::PatternSequence => "Pattern Sequence Display",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which component's revision a version query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RevisionTarget {
    #[default]
    Dm365Software = 0x00,
    FpgaFirmware = 0x10,
    Msp430Software = 0x20,
}

/// Built-in test patterns, selected by index 0-13
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TestPattern {
    #[default]
    Checkerboard14x8 = 0x00,
    SolidBlack = 0x01,
    SolidWhite = 0x02,
    SolidGreen = 0x03,
    SolidBlue = 0x04,
    SolidRed = 0x05,
    /// 1 white, 7 black
    VerticalLines1W7B = 0x06,
    /// 1 white, 7 black
    HorizontalLines1W7B = 0x07,
    /// 1 white, 1 black
    VerticalLines1W1B = 0x08,
    /// 1 white, 1 black
    HorizontalLines1W1B = 0x09,
    DiagonalLines = 0x0A,
    VerticalGrayRamps = 0x0B,
    HorizontalGrayRamps = 0x0C,
    AnsiCheckerboard4x4 = 0x0D,
}

impl TestPattern {
    /// Highest valid pattern index
    pub const MAX_INDEX: u8 = 0x0D;

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Checkerboard14x8),
            0x01 => Some(Self::SolidBlack),
            0x02 => Some(Self::SolidWhite),
            0x03 => Some(Self::SolidGreen),
            0x04 => Some(Self::SolidBlue),
            0x05 => Some(Self::SolidRed),
            0x06 => Some(Self::VerticalLines1W7B),
            0x07 => Some(Self::HorizontalLines1W7B),
            0x08 => Some(Self::VerticalLines1W1B),
            0x09 => Some(Self::HorizontalLines1W1B),
            0x0A => Some(Self::DiagonalLines),
            0x0B => Some(Self::VerticalGrayRamps),
            0x0C => Some(Self::HorizontalGrayRamps),
            0x0D => Some(Self::AnsiCheckerboard4x4),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Checkerboard14x8 => "14x8 Checkerboard",
            Self::SolidBlack => "Solid black",
            Self::SolidWhite => "Solid white",
            Self::SolidGreen => "Solid green",
            Self::SolidBlue => "Solid blue",
            Self::SolidRed => "Solid red",
            Self::VerticalLines1W7B => "Vertical lines (1-white, 7-black)",
            Self::HorizontalLines1W7B => "Horizontal lines (1-white, 7-black)",
            Self::VerticalLines1W1B => "Vertical lines (1-white, 1-black)",
            Self::HorizontalLines1W1B => "Horizontal lines (1-white, 1-black)",
            Self::DiagonalLines => "Diagonal lines",
            Self::VerticalGrayRamps => "Vertical gray ramps",
            Self::HorizontalGrayRamps => "Horizontal gray ramps",
            Self::AnsiCheckerboard4x4 => "ANSI 4x4 Checkerboard",
        }
    }
}

impl fmt::Display for TestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Image orientation applied by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplaySetting {
    pub flip_x: bool,
    pub flip_y: bool,
    pub rotate: bool,
}

impl DisplaySetting {
    pub fn new(flip_x: bool, flip_y: bool, rotate: bool) -> Self {
        Self {
            flip_x,
            flip_y,
            rotate,
        }
    }

    /// Wire form: one 0/1 byte per field
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            u8::from(self.flip_x),
            u8::from(self.flip_y),
            u8::from(self.rotate),
        ]
    }
}
