//! VE.Direct device communication and protocol handling.
//!
//! The protocol multiplexes two sub-protocols over one serial wire:
//!
//! - a continuously transmitted text telemetry stream of tab-separated
//!   key/value blocks ([`text`]),
//! - a request/response hex command channel for reading device registers
//!   ([`hex`]), used here to pull per-day history records ([`history`],
//!   [`fetch`]).
//!
//! I/O is strictly half-duplex and single-reader: while a history request is
//! outstanding, every incoming byte belongs to that request's framer and
//! telemetry emission is suspended.

pub mod checksum;
pub mod error;
pub mod fetch;
pub mod hex;
pub mod history;
pub mod text;

pub use error::VeDirectError;
pub use fetch::{FetchOptions, FetchedDay, HistoryFetcher};
pub use hex::{HexCommand, HexResponseFramer};
pub use history::HistoryDayRecord;
pub use text::{Frame, TextFrameDecoder};

#[cfg(feature = "serial")]
use log::{debug, info};
use std::time::Duration;

/// VE.Direct links always run at 19200 baud, 8 data bits, no parity.
pub const BAUD_RATE: u32 = 19200;

/// Serial read timeout. A timed-out read surfaces as `Ok(0)`, which callers
/// treat as "no data yet" rather than an error.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Byte-oriented duplex stream to the controller.
///
/// The one seam between the protocol engine and the outside world; tests
/// substitute a scripted implementation.
pub trait Transport {
    /// Write the full buffer to the device.
    fn send(&mut self, bytes: &[u8]) -> Result<(), VeDirectError>;

    /// Read whatever is available, returning the byte count. Returns
    /// `Ok(0)` on read timeout instead of blocking forever.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, VeDirectError>;
}

/// Serial port transport for a physical VE.Direct link.
#[cfg(feature = "serial")]
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

#[cfg(feature = "serial")]
impl SerialTransport {
    /// Open `port_name` with VE.Direct line settings (19200 8N1) and purge
    /// any telemetry the controller buffered before we attached.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, VeDirectError> {
        use std::io::Read;

        info!("Opening VE.Direct port {} at {} baud", port_name, baud_rate);
        let builder = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None);
        let mut port = builder.open().map_err(|e| {
            VeDirectError::Transport(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("failed to open {}: {}", port_name, e),
            ))
        })?;
        // Drop whatever partial telemetry block is sitting in the buffer so
        // decoding starts at a clean boundary.
        let mut purge = [0u8; 512];
        if let Ok(available) = port.bytes_to_read() {
            if available > 0 {
                let _ = port.read(&mut purge);
                debug!("Purged {} buffered bytes from {}", available, port_name);
            }
        }
        Ok(Self { port })
    }
}

#[cfg(feature = "serial")]
impl Transport for SerialTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), VeDirectError> {
        use std::io::Write;
        self.port.write_all(bytes)?;
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, VeDirectError> {
        use std::io::Read;
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            // Timeout is the normal idle case; EINTR shows up during
            // CTRL-C/shutdown and is likewise not fatal.
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(VeDirectError::Transport(e)),
        }
    }
}

/// Handle pairing a transport with a telemetry decoder for listening mode.
///
/// Purely reactive: never writes to the transport. History fetching takes
/// the transport over separately so only one logical reader ever owns the
/// stream.
pub struct VeDirectDevice<T: Transport> {
    transport: T,
    decoder: TextFrameDecoder,
    pending: std::collections::VecDeque<Frame>,
}

impl<T: Transport> VeDirectDevice<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            decoder: TextFrameDecoder::new(),
            pending: std::collections::VecDeque::new(),
        }
    }

    /// Return the next validated telemetry frame, reading one chunk from the
    /// transport if none is queued. `Ok(None)` means the transport stayed
    /// silent for one read timeout; the caller decides whether to keep
    /// waiting. Frames completed mid-chunk are queued, never dropped.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, VeDirectError> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        let mut buf = [0u8; 256];
        let n = self.transport.read_chunk(&mut buf)?;
        if n == 0 {
            // Idle link; back off briefly so callers can loop tightly.
            tokio::time::sleep(Duration::from_millis(10)).await;
            return Ok(None);
        }
        for frame in self.decoder.feed_all(&buf[..n]) {
            self.pending.push_back(frame);
        }
        Ok(self.pending.pop_front())
    }

    /// Release the transport, discarding decoder state.
    pub fn into_transport(self) -> T {
        self.transport
    }
}
