//! Packet protocol engine for the DLP LightCrafter DM365
//!
//! This crate covers everything between a logical device operation and the
//! bytes on the wire:
//!
//! - packet building and checksums (`protocol`)
//! - splitting image/pattern payloads into continuation frames (`fragment`)
//! - typed commands (`command`)
//! - response classification and decoding (`response`)
//! - a blocking TCP backend and a logging middleware (`tcp`, `printer`)
//!
//! The [`Transport`] trait is strictly request/response: one frame out, one
//! frame back. The protocol has no request ids, so a transport must never
//! have two requests in flight. Methods take `&mut self`; sharing a transport
//! between threads requires the caller's own locking.

pub mod command;
pub mod config;
pub mod error;
pub mod fragment;
pub mod printer;
pub mod protocol;
pub mod response;
pub mod types;

mod tcp;

pub use command::{
    BulkCommand, DisplayPattern, GetDisplayMode, GetDisplaySetting, GetRevision, PacketCommand,
    PatternDefinition, PatternSequenceSettings, SetDisplayMode, SetDisplaySetting,
    SetPatternSequenceRunning, SetPatternSequenceSetting, SetTestPattern, SettingsError,
    StaticImage, TransportExt, TriggerType, MAX_DISPLAY_PATTERN,
};
pub use config::TransportConfig;
pub use error::{FrameError, TransportError};
pub use fragment::{fragment, Fragment, Fragments};
pub use printer::{PacketFilter, PrinterConfig, PrinterTransport};
pub use protocol::{build_packet, checksum, verify_checksum, PacketHeader};
pub use response::{decode_error, ErrorCode, ParseError, ResponseFrame, Status};
pub use tcp::TcpTransport;
pub use types::{
    ContinuationFlag, DisplayMode, DisplaySetting, PacketType, RevisionTarget, TestPattern,
};

use tracing::warn;

/// The core transport trait - all backends implement this
pub trait Transport {
    /// Write one complete frame
    fn send_packet(&mut self, packet: &[u8]) -> Result<(), TransportError>;

    /// Block until one complete response frame has been read
    fn read_frame(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Send a frame and wait for its response
    ///
    /// The response is parsed but its status is not acted on; busy and error
    /// frames are returned like any other.
    fn transfer(&mut self, packet: &[u8]) -> Result<ResponseFrame, TransportError> {
        self.send_packet(packet)?;
        let frame = ResponseFrame::parse(self.read_frame()?)?;
        if !frame.checksum_valid() {
            warn!(
                "Response checksum mismatch: {:02x?}",
                &frame.as_bytes()[..frame.as_bytes().len().min(protocol::HEADER_SIZE)]
            );
        }
        Ok(frame)
    }

    /// Close the connection gracefully
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_packet(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        (**self).send_packet(packet)
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).read_frame()
    }

    fn transfer(&mut self, packet: &[u8]) -> Result<ResponseFrame, TransportError> {
        (**self).transfer(packet)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}
