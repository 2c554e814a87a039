//! TCP transport to the DM365 network interface

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::protocol::{CHECKSUM_SIZE, HEADER_SIZE};
use crate::Transport;

/// Blocking TCP connection to one device
///
/// Reads are framed by the length field of the response header, so a
/// response split over several TCP segments is still read as one frame.
///
/// Responses carry no request id. Once a read or write fails (timeout
/// included) a late or partial answer may still be in flight, so the stream
/// is shut down and every later call fails with `Disconnected`.
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    max_response_size: usize,
    dead: bool,
}

impl TcpTransport {
    /// Connect and apply the configured timeouts.
    ///
    /// Every resolved address is tried in turn; the last failure is reported.
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        config: &TransportConfig,
    ) -> Result<Self, TransportError> {
        config.validate()?;

        let addrs: Vec<SocketAddr> = addr
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                addr: "<unresolved>".into(),
                source,
            })?
            .collect();

        let mut last_err = io::Error::new(io::ErrorKind::InvalidInput, "no addresses to connect to");
        let mut last_addr = String::from("<none>");
        for candidate in addrs {
            debug!("Connecting to {}", candidate);
            match TcpStream::connect_timeout(&candidate, config.connect_timeout()) {
                Ok(stream) => {
                    info!("Connected to {}", candidate);
                    return Self::from_stream(stream, config);
                }
                Err(e) => {
                    debug!("Connect to {} failed: {}", candidate, e);
                    last_addr = candidate.to_string();
                    last_err = e;
                }
            }
        }

        Err(TransportError::Connect {
            addr: last_addr,
            source: last_err,
        })
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream, config: &TransportConfig) -> Result<Self, TransportError> {
        config.validate()?;
        stream.set_read_timeout(Some(config.read_timeout()))?;
        stream.set_write_timeout(Some(config.write_timeout()))?;
        stream.set_nodelay(config.nodelay)?;
        let peer = stream.peer_addr()?;
        Ok(Self {
            stream,
            peer,
            max_response_size: config.max_response_size,
            dead: false,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn max_response_size(&self) -> usize {
        self.max_response_size
    }

    /// False once the stream has been shut down after a failure
    pub fn is_open(&self) -> bool {
        !self.dead
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.dead {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }

    /// Take the stream out of service; it can no longer be trusted to be
    /// aligned on a frame boundary.
    fn invalidate(&mut self, reason: &TransportError) {
        if self.dead {
            return;
        }
        self.dead = true;
        warn!("Dropping connection to {}: {}", self.peer, reason);
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(packet)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_packet(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut header = [0u8; HEADER_SIZE];
        self.stream.read_exact(&mut header)?;

        let declared = u16::from_le_bytes([header[4], header[5]]) as usize;
        let total = HEADER_SIZE + declared + CHECKSUM_SIZE;
        if total > self.max_response_size {
            return Err(TransportError::ResponseTooLarge {
                declared: total,
                limit: self.max_response_size,
            });
        }

        let mut frame = vec![0u8; total];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        self.stream.read_exact(&mut frame[HEADER_SIZE..])?;
        Ok(frame)
    }
}

impl Transport for TcpTransport {
    fn send_packet(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        self.ensure_open()?;
        debug!("Sending {} bytes to {}", packet.len(), self.peer);
        self.write_packet(packet).inspect_err(|e| self.invalidate(e))
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        self.ensure_open()?;
        let frame = self.read_packet().inspect_err(|e| self.invalidate(e))?;
        debug!("Received {} bytes from {}", frame.len(), self.peer);
        Ok(frame)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.dead {
            return Ok(());
        }
        self.dead = true;
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => {
                debug!("Closed connection to {}", self.peer);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}
