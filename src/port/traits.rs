//! Core traits for serial port abstraction.
//!
//! `SerialPortAdapter` is the raw byte-level seam: real hardware goes through
//! [`SyncSerialPort`](super::SyncSerialPort), tests go through
//! [`MockSerialPort`](super::MockSerialPort). Line framing and timeouts live a
//! level up, in [`LineTransport`](super::LineTransport).

use super::error::PortError;
use std::time::Duration;

/// Granularity of a single hardware read.
///
/// Logical timeouts are enforced by `LineTransport`; the driver only needs to
/// wake up often enough for those to be honored.
pub const DEFAULT_READ_POLL: Duration = Duration::from_millis(20);

/// Configuration parameters for opening a serial port.
///
/// Test boards always talk 8N1 without flow control, so only the rate and the
/// driver-level read timeout are configurable.
#[derive(Debug, Clone)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Driver-level read timeout.
    pub read_poll: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_poll: DEFAULT_READ_POLL,
        }
    }
}

impl PortConfiguration {
    /// Configuration with the given baud rate and default polling.
    pub fn with_baud(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Default::default()
        }
    }
}

/// Trait for raw serial port I/O and modem control lines.
///
/// Implementations must treat "no data yet" as either `Ok(0)` or an idle error
/// (see [`PortError::is_idle`]), never as a hard failure.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Discard any unread data in the receive buffer.
    fn clear_input(&mut self) -> Result<(), PortError>;

    /// Drive the DTR control line.
    fn set_dtr(&mut self, level: bool) -> Result<(), PortError>;

    /// Drive the RTS control line.
    fn set_rts(&mut self, level: bool) -> Result<(), PortError>;
}
