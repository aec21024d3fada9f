//! Line-oriented transport on top of a raw serial port.
//!
//! The test image speaks a line protocol, so everything above this layer
//! works in lines: `read_line` frames bytes on `\n`, `wait_line` feeds lines to
//! a predicate until it matches or the port goes quiet.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use memchr::memchr;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tracing::warn;

/// Settle time between asserting and releasing the reset line.
pub const DEFAULT_RESET_PULSE: Duration = Duration::from_millis(50);

const READ_CHUNK: usize = 256;
/// Back-off when a non-blocking port reports no data.
const IDLE_BACKOFF: Duration = Duration::from_millis(2);

/// Serial connection that hands out whole lines.
///
/// `timeout` is the line-level read timeout: `read_line` gives up once that
/// long has passed without a full line. `None` blocks until a line arrives.
#[derive(Debug)]
pub struct LineTransport {
    port: Box<dyn SerialPortAdapter>,
    pending: Vec<u8>,
    timeout: Option<Duration>,
    reset_pulse: Duration,
}

impl LineTransport {
    /// Wrap a raw port. The transport starts out blocking.
    pub fn new(port: impl SerialPortAdapter + 'static) -> Self {
        Self::from_boxed(Box::new(port))
    }

    pub fn from_boxed(port: Box<dyn SerialPortAdapter>) -> Self {
        Self {
            port,
            pending: Vec::new(),
            timeout: None,
            reset_pulse: DEFAULT_RESET_PULSE,
        }
    }

    pub fn with_reset_pulse(mut self, reset_pulse: Duration) -> Self {
        self.reset_pulse = reset_pulse;
        self
    }

    pub fn name(&self) -> &str {
        self.port.name()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Override the read timeout until the returned guard is dropped.
    ///
    /// The previous value is put back on every exit path, including unwinding.
    pub fn override_timeout(&mut self, timeout: Option<Duration>) -> TimeoutGuard<'_> {
        let previous = std::mem::replace(&mut self.timeout, timeout);
        TimeoutGuard {
            transport: self,
            previous,
        }
    }

    /// Write raw bytes to the device.
    pub fn write(&mut self, data: &[u8]) -> Result<(), PortError> {
        let mut written = 0;
        while written < data.len() {
            let n = self.port.write_bytes(&data[written..])?;
            if n == 0 {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "port accepted no data",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Read one line, terminator included.
    ///
    /// Returns `Ok(None)` when nothing arrived within the timeout. If only part
    /// of a line arrived (a prompt, say) that fragment is returned as-is.
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>, PortError> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(pos) = memchr(b'\n', &self.pending) {
                return Ok(Some(self.pending.drain(..=pos).collect()));
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }

            match self.port.read_bytes(&mut chunk) {
                Ok(0) => std::thread::sleep(IDLE_BACKOFF),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.is_idle() => {
                    if matches!(&e, PortError::Io(io) if io.kind() == std::io::ErrorKind::WouldBlock)
                    {
                        std::thread::sleep(IDLE_BACKOFF);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if self.pending.is_empty() {
            Ok(None)
        } else {
            Ok(Some(std::mem::take(&mut self.pending)))
        }
    }

    /// Feed lines to `predicate` until it returns `Some`, or until a read
    /// times out.
    ///
    /// Lines are decoded lossily and stripped of trailing whitespace before
    /// the predicate sees them. `timeout` applies per line, so a device that
    /// keeps talking keeps this call alive.
    pub fn wait_line<R, F>(&mut self, timeout: Duration, mut predicate: F) -> Result<Option<R>, PortError>
    where
        F: FnMut(&str) -> Option<R>,
    {
        let mut port = self.override_timeout(Some(timeout));
        while let Some(raw) = port.read_line()? {
            let line = String::from_utf8_lossy(&raw);
            if let Some(found) = predicate(line.trim_end()) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Pull the board into reset and release it.
    ///
    /// DTR is released and RTS held for the pulse width; anything received
    /// meanwhile is discarded so the next line read comes from the fresh boot.
    pub fn pulse_reset(&mut self) -> Result<(), PortError> {
        self.port.set_dtr(false)?;
        self.port.set_rts(true)?;
        std::thread::sleep(self.reset_pulse);
        self.port.clear_input()?;
        self.pending.clear();
        self.port.set_rts(false)
    }
}

/// Restores a [`LineTransport`]'s timeout when dropped.
pub struct TimeoutGuard<'a> {
    transport: &'a mut LineTransport,
    previous: Option<Duration>,
}

impl Deref for TimeoutGuard<'_> {
    type Target = LineTransport;

    fn deref(&self) -> &LineTransport {
        self.transport
    }
}

impl DerefMut for TimeoutGuard<'_> {
    fn deref_mut(&mut self) -> &mut LineTransport {
        self.transport
    }
}

impl Drop for TimeoutGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            warn!(port = self.transport.name(), "restoring read timeout while unwinding");
        }
        self.transport.timeout = self.previous;
    }
}
