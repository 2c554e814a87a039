//! High-level interface for the DLP LightCrafter DM365
//!
//! A [`Projector`] owns one transport and turns logical operations into
//! command packets. Mode-gated transfers (static images, test patterns,
//! pattern definitions) switch the display mode first, and every fragment's
//! response is checked before the next one is sent.
//!
//! ```no_run
//! use lightcrafter::{Projector, TestPattern, TransportConfig};
//!
//! let mut projector = Projector::connect(("192.168.1.100", 21845), &TransportConfig::default())?;
//! println!("{}", projector.get_display_mode()?);
//! projector.show_test_pattern(TestPattern::AnsiCheckerboard4x4)?;
//! projector.close()?;
//! # Ok::<(), lightcrafter::ProjectorError>(())
//! ```

pub mod error;

pub use error::ProjectorError;

pub use lightcrafter_transport::protocol::{cmd, device::DEFAULT_PORT, MAX_PAYLOAD_SIZE};
pub use lightcrafter_transport::{
    decode_error, DisplayMode, DisplaySetting, ErrorCode, PacketFilter, PatternSequenceSettings,
    PrinterConfig, PrinterTransport, RevisionTarget, TcpTransport, TestPattern, Transport,
    TransportConfig, TransportError, TriggerType,
};

use std::net::ToSocketAddrs;
use std::path::Path;

use lightcrafter_transport::command::{
    BulkCommand, DisplayPattern, GetDisplayMode, GetDisplaySetting, GetRevision, PacketCommand,
    PatternDefinition, SetDisplayMode, SetDisplaySetting, SetPatternSequenceRunning,
    SetPatternSequenceSetting, SetTestPattern, StaticImage, TransportExt,
};
use lightcrafter_transport::{FrameError, ResponseFrame, Status};
use tracing::{debug, info, warn};

/// Session with one projector
///
/// Methods take `&mut self`: the protocol allows a single request in flight,
/// so a session shared between threads needs the caller's own lock.
pub struct Projector<T: Transport = TcpTransport> {
    transport: T,
    chunk_size: usize,
    mode: Option<DisplayMode>,
}

impl Projector<TcpTransport> {
    /// Open a TCP session using the given transport configuration
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        config: &TransportConfig,
    ) -> Result<Self, ProjectorError> {
        let transport = TcpTransport::connect(addr, config)?;
        info!("Projector session open on {}", transport.peer_addr());
        Self::new(transport).with_chunk_size(config.chunk_size)
    }
}

impl<T: Transport> Projector<T> {
    /// Wrap an existing transport (fragments default to 512 payload bytes)
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            chunk_size: MAX_PAYLOAD_SIZE,
            mode: None,
        }
    }

    /// Payload bytes per fragment for image and pattern transfers
    pub fn with_chunk_size(mut self, size: usize) -> Result<Self, ProjectorError> {
        if size == 0 || size > MAX_PAYLOAD_SIZE {
            return Err(FrameError::InvalidChunkSize {
                size,
                max: MAX_PAYLOAD_SIZE,
            }
            .into());
        }
        self.chunk_size = size;
        Ok(self)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Last display mode the device confirmed, if known
    pub fn current_mode(&self) -> Option<DisplayMode> {
        self.mode
    }

    // === Plumbing ===

    fn execute<C: PacketCommand>(&mut self, command: &C) -> Result<ResponseFrame, ProjectorError> {
        debug!("Executing {}", cmd::name(C::COMMAND));
        let frame = self.transport.execute(command)?;
        check(C::COMMAND, frame)
    }

    /// Stream a fragmented payload, stopping at the first non-success answer
    fn send_bulk<'a, C: BulkCommand<'a>>(&mut self, command: C) -> Result<(), ProjectorError> {
        let fragments = command.fragments(self.chunk_size)?;
        let total = fragments.total();
        for fragment in fragments {
            debug!(
                "{} fragment {}/{} {:?} ({} bytes)",
                cmd::name(C::COMMAND),
                fragment.index + 1,
                total,
                fragment.flag,
                fragment.payload.len()
            );
            let frame = self.transport.transfer(fragment.as_bytes())?;
            if let Err(e) = check(C::COMMAND, frame) {
                warn!(
                    "{} aborted at fragment {}/{}: {}",
                    cmd::name(C::COMMAND),
                    fragment.index + 1,
                    total,
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }

    // === Device Info ===

    /// Query the active display mode
    pub fn get_display_mode(&mut self) -> Result<DisplayMode, ProjectorError> {
        let frame = self.execute(&GetDisplayMode)?;
        let mode = frame.display_mode()?;
        self.mode = Some(mode);
        Ok(mode)
    }

    /// Query a revision string (DM365 software, FPGA or MSP430 firmware)
    pub fn get_revision(&mut self, target: RevisionTarget) -> Result<String, ProjectorError> {
        let frame = self.execute(&GetRevision(target))?;
        Ok(frame.revision()?)
    }

    // === Display Mode ===

    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Result<(), ProjectorError> {
        match self.execute(&SetDisplayMode(mode)) {
            Ok(_) => {
                info!("Display mode set to {}", mode);
                self.mode = Some(mode);
                Ok(())
            }
            Err(e) => {
                // The device may or may not have switched
                self.mode = None;
                Err(e)
            }
        }
    }

    pub fn set_mode_to_static_image(&mut self) -> Result<(), ProjectorError> {
        self.set_display_mode(DisplayMode::StaticImage)
    }

    pub fn set_mode_to_internal_test_pattern(&mut self) -> Result<(), ProjectorError> {
        self.set_display_mode(DisplayMode::InternalTestPattern)
    }

    pub fn set_mode_to_pattern_sequence(&mut self) -> Result<(), ProjectorError> {
        self.set_display_mode(DisplayMode::PatternSequence)
    }

    // === Static Image ===

    /// Switch to static image mode and upload an image (opaque bytes, usually a BMP)
    pub fn display_static_image(&mut self, image: &[u8]) -> Result<(), ProjectorError> {
        if image.is_empty() {
            return Err(ProjectorError::InvalidParameter("image is empty".into()));
        }
        self.set_mode_to_static_image()?;
        info!("Uploading static image ({} bytes)", image.len());
        self.send_bulk(StaticImage::new(image))
    }

    pub fn display_static_image_file(&mut self, path: impl AsRef<Path>) -> Result<(), ProjectorError> {
        let image = read_file(path.as_ref())?;
        self.display_static_image(&image)
    }

    // === Test Patterns ===

    /// Show built-in test pattern `pattern` (0-13)
    ///
    /// Out of range values are rejected before anything is sent.
    pub fn display_internal_test_pattern(&mut self, pattern: u8) -> Result<(), ProjectorError> {
        let pattern = TestPattern::from_u8(pattern).ok_or_else(|| {
            ProjectorError::InvalidParameter(format!(
                "test pattern {} out of range (0..={})",
                pattern,
                TestPattern::MAX_INDEX
            ))
        })?;
        self.show_test_pattern(pattern)
    }

    pub fn show_test_pattern(&mut self, pattern: TestPattern) -> Result<(), ProjectorError> {
        self.set_mode_to_internal_test_pattern()?;
        self.execute(&SetTestPattern(pattern))?;
        info!("Showing test pattern {}", pattern);
        Ok(())
    }

    // === Display Settings ===

    /// Set image orientation (flip X, flip Y, rotate)
    pub fn set_display_setting(&mut self, setting: DisplaySetting) -> Result<(), ProjectorError> {
        self.execute(&SetDisplaySetting(setting))?;
        Ok(())
    }

    pub fn get_display_setting(&mut self) -> Result<DisplaySetting, ProjectorError> {
        let frame = self.execute(&GetDisplaySetting)?;
        Ok(frame.display_setting()?)
    }

    // === Pattern Sequence ===

    /// Configure the pattern sequence (validated before encoding)
    pub fn set_pattern_sequence_settings(
        &mut self,
        settings: &PatternSequenceSettings,
    ) -> Result<(), ProjectorError> {
        let command = SetPatternSequenceSetting::new(settings)?;
        self.execute(&command)?;
        Ok(())
    }

    /// Upload the image for pattern slot `index`
    pub fn define_pattern(&mut self, index: u8, image: &[u8]) -> Result<(), ProjectorError> {
        if image.is_empty() {
            return Err(ProjectorError::InvalidParameter(format!(
                "pattern {index} image is empty"
            )));
        }
        self.set_mode_to_pattern_sequence()?;
        info!("Defining pattern {} ({} bytes)", index, image.len());
        self.send_bulk(&PatternDefinition::new(index, image))
    }

    pub fn define_pattern_file(
        &mut self,
        index: u8,
        path: impl AsRef<Path>,
    ) -> Result<(), ProjectorError> {
        let image = read_file(path.as_ref())?;
        self.define_pattern(index, &image)
    }

    pub fn start_pattern_sequence(&mut self) -> Result<(), ProjectorError> {
        self.execute(&SetPatternSequenceRunning(true))?;
        info!("Pattern sequence started");
        Ok(())
    }

    pub fn stop_pattern_sequence(&mut self) -> Result<(), ProjectorError> {
        self.execute(&SetPatternSequenceRunning(false))?;
        info!("Pattern sequence stopped");
        Ok(())
    }

    /// Hold one pattern (1-1500) of the loaded sequence on screen
    pub fn display_pattern(&mut self, pattern: u16) -> Result<(), ProjectorError> {
        let command = DisplayPattern::new(pattern)?;
        self.execute(&command)?;
        Ok(())
    }

    /// Close the connection
    pub fn close(mut self) -> Result<(), ProjectorError> {
        self.transport.close()?;
        info!("Projector session closed");
        Ok(())
    }
}

/// Map a response status to a result
fn check(command: u16, frame: ResponseFrame) -> Result<ResponseFrame, ProjectorError> {
    match frame.status() {
        Status::Success => match frame.command() {
            Some(echo) if echo != command => Err(ProjectorError::UnexpectedResponse(format!(
                "sent {} (0x{:04x}), answer is for 0x{:04x}",
                cmd::name(command),
                command,
                echo
            ))),
            _ => Ok(frame),
        },
        Status::Busy => Err(ProjectorError::Busy { command }),
        Status::Error(code) => Err(ProjectorError::Device { command, code }),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ProjectorError> {
    std::fs::read(path).map_err(|source| ProjectorError::Io {
        path: path.to_path_buf(),
        source,
    })
}
