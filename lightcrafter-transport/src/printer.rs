//! PrinterTransport middleware for monitoring/tracing transport operations
//!
//! Wraps any [`Transport`] and logs every outgoing packet and incoming
//! response through `tracing` at `info` level.
//!
//! # Example
//!
//! ```ignore
//! use lightcrafter_transport::{PacketFilter, PrinterConfig, PrinterTransport, TcpTransport};
//!
//! let tcp = TcpTransport::connect(("192.168.1.100", 21845), &Default::default())?;
//! let config = PrinterConfig::default().with_hex(true);
//! let monitored = PrinterTransport::wrap(tcp, config);
//! ```

use std::str::FromStr;

use tracing::info;

use crate::protocol::{cmd, HEADER_SIZE};
use crate::response::{ResponseFrame, Status};
use crate::types::{ContinuationFlag, PacketType};
use crate::{Transport, TransportError};

/// Packet filter for selective display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketFilter {
    #[default]
    All,
    /// Only packets carrying this command id
    Cmd(u16),
}

impl FromStr for PacketFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            s if s.starts_with("cmd=") || s.starts_with("0x") => {
                let hex_str = s.strip_prefix("cmd=").unwrap_or(s);
                let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
                u16::from_str_radix(hex_str, 16)
                    .map(Self::Cmd)
                    .map_err(|e| format!("Invalid command id: {}", e))
            }
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

/// Configuration for the PrinterTransport
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Show raw hex dump alongside decoded output
    pub show_hex: bool,
    pub filter: PacketFilter,
}

impl PrinterConfig {
    pub fn with_hex(mut self, show: bool) -> Self {
        self.show_hex = show;
        self
    }

    pub fn with_filter(mut self, filter: PacketFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Transport middleware that logs all commands and responses
pub struct PrinterTransport<T> {
    inner: T,
    config: PrinterConfig,
}

impl<T: Transport> PrinterTransport<T> {
    pub fn wrap(inner: T, config: PrinterConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn should_show(&self, packet: &[u8]) -> bool {
        match self.config.filter {
            PacketFilter::All => true,
            PacketFilter::Cmd(c) => command_of(packet) == Some(c),
        }
    }

    fn print_command(&self, packet: &[u8]) {
        if !self.should_show(packet) {
            return;
        }
        info!(">>> CMD  {}", describe_packet(packet));
        if self.config.show_hex {
            info!("    HEX  {:02x?}", packet);
        }
    }

    fn print_response(&self, frame: &[u8]) {
        if !self.should_show(frame) {
            return;
        }
        let status = match ResponseFrame::parse(frame.to_vec()) {
            Ok(parsed) => match parsed.status() {
                Status::Busy => "BUSY".to_string(),
                Status::Error(code) => format!("ERROR {} ({})", code.code(), code),
                Status::Success => "OK".to_string(),
            },
            Err(e) => format!("MALFORMED ({e})"),
        };
        info!("<<< RSP  {} {}", describe_packet(frame), status);
        if self.config.show_hex {
            info!("    HEX  {:02x?}", frame);
        }
    }
}

impl<T: Transport> Transport for PrinterTransport<T> {
    fn send_packet(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        self.print_command(packet);
        self.inner.send_packet(packet)
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        let frame = self.inner.read_frame()?;
        self.print_response(&frame);
        Ok(frame)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.inner.close()
    }
}

fn command_of(packet: &[u8]) -> Option<u16> {
    match packet.get(1..3) {
        Some(&[cmd1, cmd2]) => Some(u16::from_be_bytes([cmd1, cmd2])),
        _ => None,
    }
}

/// One-line summary of a frame header, e.g. `Write DISPLAY_MODE (0x0101) Single len=1`
pub fn describe_packet(packet: &[u8]) -> String {
    if packet.len() < HEADER_SIZE {
        return format!("<{} byte fragment>", packet.len());
    }
    let packet_type = PacketType::from_u8(packet[0])
        .map(|t| format!("{:?}", t))
        .unwrap_or_else(|| format!("type 0x{:02x}", packet[0]));
    let command = u16::from_be_bytes([packet[1], packet[2]]);
    let flag = ContinuationFlag::from_u8(packet[3])
        .map(|f| format!("{:?}", f))
        .unwrap_or_else(|| format!("flag 0x{:02x}", packet[3]));
    let len = u16::from_le_bytes([packet[4], packet[5]]);
    format!(
        "{} {} (0x{:04x}) {} len={}",
        packet_type,
        cmd::name(command),
        command,
        flag,
        len
    )
}
