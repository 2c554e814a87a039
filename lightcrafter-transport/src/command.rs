//! Type-safe command builders
//!
//! Each device command is a type implementing [`PacketCommand`] (fits in one
//! frame) or [`BulkCommand`] (payload is fragmented), so the wire layout of
//! every command lives in exactly one place.

use std::fmt;

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{FrameError, TransportError};
use crate::fragment::Fragments;
use crate::protocol::{cmd, encode_single, PacketHeader};
use crate::response::ResponseFrame;
use crate::types::{DisplayMode, DisplaySetting, PacketType, RevisionTarget, TestPattern};
use crate::Transport;

/// Highest pattern number accepted by PATTERN_DISPLAY
pub const MAX_DISPLAY_PATTERN: u16 = 1500;

/// Settings rejected before anything is encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsError(String);

impl SettingsError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SettingsError {}

// =============================================================================
// Core Traits
// =============================================================================

/// A command whose payload fits in a single frame
pub trait PacketCommand {
    const PACKET_TYPE: PacketType;
    const COMMAND: u16;

    /// Payload bytes (no header, no checksum)
    fn payload(&self) -> Vec<u8>;

    /// Complete single frame with length, `Single` flag and checksum
    fn build(&self) -> Result<Vec<u8>, FrameError> {
        encode_single(
            PacketHeader::new(Self::PACKET_TYPE, Self::COMMAND),
            &self.payload(),
        )
    }
}

/// A command whose payload is streamed as continuation frames
///
/// Implemented on borrowing handles (`StaticImage`, `&PatternDefinition`),
/// so the fragments live as long as the image, not the handle.
pub trait BulkCommand<'a>: Sized {
    const PACKET_TYPE: PacketType;
    const COMMAND: u16;

    /// The whole logical payload
    fn data(self) -> &'a [u8];

    fn fragments(self, max_chunk: usize) -> Result<Fragments<'a>, FrameError> {
        Fragments::new(
            PacketHeader::new(Self::PACKET_TYPE, Self::COMMAND),
            self.data(),
            max_chunk,
        )
    }
}

/// Sending typed commands over any transport
pub trait TransportExt: Transport {
    /// Send a single-frame command and return its response
    fn execute<C: PacketCommand>(&mut self, command: &C) -> Result<ResponseFrame, TransportError> {
        self.transfer(&command.build()?)
    }
}

impl<T: Transport + ?Sized> TransportExt for T {}

// =============================================================================
// Display mode / version
// =============================================================================

/// Read the active display mode
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDisplayMode;

impl PacketCommand for GetDisplayMode {
    const PACKET_TYPE: PacketType = PacketType::Read;
    const COMMAND: u16 = cmd::DISPLAY_MODE;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// Switch display mode
#[derive(Debug, Clone, Copy)]
pub struct SetDisplayMode(pub DisplayMode);

impl PacketCommand for SetDisplayMode {
    const PACKET_TYPE: PacketType = PacketType::Write;
    const COMMAND: u16 = cmd::DISPLAY_MODE;

    fn payload(&self) -> Vec<u8> {
        vec![self.0 as u8]
    }
}

/// Read a revision string
#[derive(Debug, Clone, Copy, Default)]
pub struct GetRevision(pub RevisionTarget);

impl PacketCommand for GetRevision {
    const PACKET_TYPE: PacketType = PacketType::Read;
    const COMMAND: u16 = cmd::VERSION;

    fn payload(&self) -> Vec<u8> {
        vec![self.0 as u8]
    }
}

// =============================================================================
// Test patterns / orientation
// =============================================================================

/// Select a built-in test pattern (device must be in test pattern mode)
#[derive(Debug, Clone, Copy)]
pub struct SetTestPattern(pub TestPattern);

impl PacketCommand for SetTestPattern {
    const PACKET_TYPE: PacketType = PacketType::Write;
    const COMMAND: u16 = cmd::TEST_PATTERN;

    fn payload(&self) -> Vec<u8> {
        vec![self.0 as u8]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SetDisplaySetting(pub DisplaySetting);

impl PacketCommand for SetDisplaySetting {
    const PACKET_TYPE: PacketType = PacketType::Write;
    const COMMAND: u16 = cmd::DISPLAY_SETTING;

    fn payload(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetDisplaySetting;

impl PacketCommand for GetDisplaySetting {
    const PACKET_TYPE: PacketType = PacketType::Read;
    const COMMAND: u16 = cmd::DISPLAY_SETTING;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

// =============================================================================
// Image data
// =============================================================================

/// Static image file contents (opaque bytes, typically a BMP)
#[derive(Debug, Clone, Copy)]
pub struct StaticImage<'a> {
    image: &'a [u8],
}

impl<'a> StaticImage<'a> {
    pub fn new(image: &'a [u8]) -> Self {
        Self { image }
    }
}

impl<'a> BulkCommand<'a> for StaticImage<'a> {
    const PACKET_TYPE: PacketType = PacketType::Write;
    const COMMAND: u16 = cmd::STATIC_IMAGE;

    fn data(self) -> &'a [u8] {
        self.image
    }
}

/// Pattern image for one slot of the pattern sequence
///
/// The logical payload is the slot index followed by the image bytes; only
/// the first fragment carries the index.
#[derive(Debug, Clone)]
pub struct PatternDefinition {
    index: u8,
    data: Vec<u8>,
}

impl PatternDefinition {
    pub fn new(index: u8, image: &[u8]) -> Self {
        let mut data = Vec::with_capacity(image.len() + 1);
        data.push(index);
        data.extend_from_slice(image);
        Self { index, data }
    }

    pub fn index(&self) -> u8 {
        self.index
    }
}

impl<'a> BulkCommand<'a> for &'a PatternDefinition {
    const PACKET_TYPE: PacketType = PacketType::Write;
    const COMMAND: u16 = cmd::PATTERN_DEFINITION;

    fn data(self) -> &'a [u8] {
        &self.data
    }
}

// =============================================================================
// Pattern sequence
// =============================================================================

/// Pattern sequence timing and trigger configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSequenceSettings {
    /// Bits per pattern (1-8)
    pub bit_depth: u8,
    /// Number of patterns in the sequence
    pub pattern_count: u8,
    /// Sequence mode byte, passed through as-is
    pub mode: u8,
    pub trigger: TriggerType,
    /// Delay after an external trigger (µs)
    pub trigger_delay_us: u32,
    /// Pattern period in auto-trigger mode (µs)
    pub auto_trigger_period_us: u32,
    /// Exposure per pattern (µs)
    pub exposure_time_us: u32,
    /// LED select byte
    pub led_select: u8,
}

/// How the sequence advances from pattern to pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TriggerType {
    /// Hardware trigger input
    External = 0,
    #[default]
    Auto = 1,
}

impl Default for PatternSequenceSettings {
    fn default() -> Self {
        Self {
            bit_depth: 8,
            pattern_count: 2,
            mode: 0,
            trigger: TriggerType::Auto,
            trigger_delay_us: 0,
            auto_trigger_period_us: 3_333_334,
            exposure_time_us: 3_333_334,
            led_select: 1,
        }
    }
}

impl PatternSequenceSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_depth(mut self, bits: u8) -> Self {
        self.bit_depth = bits;
        self
    }

    pub fn pattern_count(mut self, count: u8) -> Self {
        self.pattern_count = count;
        self
    }

    pub fn mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    pub fn trigger(mut self, trigger: TriggerType) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn trigger_delay_us(mut self, us: u32) -> Self {
        self.trigger_delay_us = us;
        self
    }

    pub fn auto_trigger_period_us(mut self, us: u32) -> Self {
        self.auto_trigger_period_us = us;
        self
    }

    pub fn exposure_time_us(mut self, us: u32) -> Self {
        self.exposure_time_us = us;
        self
    }

    pub fn led_select(mut self, led: u8) -> Self {
        self.led_select = led;
        self
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=8).contains(&self.bit_depth) {
            return Err(SettingsError::new(format!(
                "bit depth {} out of range (1..=8)",
                self.bit_depth
            )));
        }
        if self.pattern_count == 0 {
            return Err(SettingsError::new("pattern count must be at least 1"));
        }
        if self.trigger == TriggerType::Auto
            && self.exposure_time_us > self.auto_trigger_period_us
        {
            return Err(SettingsError::new(format!(
                "exposure {}us exceeds auto-trigger period {}us",
                self.exposure_time_us, self.auto_trigger_period_us
            )));
        }
        Ok(())
    }
}

/// PATTERN_SEQ_SETTING (0x0400), 17-byte payload.
///
/// Built only through [`SetPatternSequenceSetting::new`], which validates.
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SetPatternSequenceSetting {
    bit_depth: u8,
    pattern_count: u8,
    mode: u8,
    trigger_type: u8,
    trigger_delay: U32,
    auto_trigger_period: U32,
    exposure_time: U32,
    led_select: u8,
}

impl SetPatternSequenceSetting {
    pub fn new(settings: &PatternSequenceSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            bit_depth: settings.bit_depth,
            pattern_count: settings.pattern_count,
            mode: settings.mode,
            trigger_type: settings.trigger as u8,
            trigger_delay: U32::new(settings.trigger_delay_us),
            auto_trigger_period: U32::new(settings.auto_trigger_period_us),
            exposure_time: U32::new(settings.exposure_time_us),
            led_select: settings.led_select,
        })
    }
}

impl PacketCommand for SetPatternSequenceSetting {
    const PACKET_TYPE: PacketType = PacketType::Write;
    const COMMAND: u16 = cmd::PATTERN_SEQ_SETTING;

    fn payload(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// Start (`true`) or stop (`false`) the pattern sequence
#[derive(Debug, Clone, Copy)]
pub struct SetPatternSequenceRunning(pub bool);

impl PacketCommand for SetPatternSequenceRunning {
    const PACKET_TYPE: PacketType = PacketType::Write;
    const COMMAND: u16 = cmd::PATTERN_SEQ_START;

    fn payload(&self) -> Vec<u8> {
        vec![u8::from(self.0)]
    }
}

/// Continuously display one pattern of the loaded sequence
#[derive(Debug, Clone, Copy)]
pub struct DisplayPattern {
    pattern: u16,
}

impl DisplayPattern {
    pub fn new(pattern: u16) -> Result<Self, SettingsError> {
        if !(1..=MAX_DISPLAY_PATTERN).contains(&pattern) {
            return Err(SettingsError::new(format!(
                "pattern number {pattern} out of range (1..={MAX_DISPLAY_PATTERN})"
            )));
        }
        Ok(Self { pattern })
    }
}

impl PacketCommand for DisplayPattern {
    const PACKET_TYPE: PacketType = PacketType::Write;
    const COMMAND: u16 = cmd::PATTERN_DISPLAY;

    fn payload(&self) -> Vec<u8> {
        self.pattern.to_le_bytes().to_vec()
    }
}
