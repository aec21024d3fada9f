//! Mock serial port implementation for testing.
//!
//! `MockSerialPort` behaves like a board running the test image closely enough
//! to drive environments and monitors end to end: it answers reset pulses and
//! written commands with scripted output, and records everything the host did.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Inner state of the mock port, shared between clones.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Expected write operations (for verification).
    expected_writes: VecDeque<Vec<u8>>,
    /// Output for the next reset pulses, consumed one per pulse.
    reset_script: VecDeque<Vec<u8>>,
    /// Output for every pulse once `reset_script` is exhausted.
    reset_default: Option<Vec<u8>>,
    /// Replies keyed by the exact bytes written.
    write_replies: HashMap<Vec<u8>, Vec<u8>>,
    /// Number of completed reset pulses.
    reset_count: usize,
    dtr: bool,
    rts: bool,
    /// Whether the next read/write should fail with a non-idle error.
    should_fail: bool,
    /// Whether input has been cleared since the last check.
    input_cleared: bool,
}

/// Mock serial port implementation for testing.
///
/// A reset pulse is recognised on the falling edge of RTS, matching the
/// auto-reset circuit on ESP development boards.
///
/// # Example
/// ```
/// use hil_test_runner::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.on_reset(b"esp-open-rtos test runner.\n");
///
/// port.set_rts(true).unwrap();
/// port.set_rts(false).unwrap();
/// assert_eq!(port.reset_count(), 1);
///
/// let mut buffer = [0u8; 64];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"esp-open-rtos test runner.\n");
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, shared so a test can keep a handle.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Output produced by the next reset pulse.
    ///
    /// Calls queue up; each pulse consumes one entry.
    pub fn on_reset(&self, data: &[u8]) {
        self.state.lock().reset_script.push_back(data.to_vec());
    }

    /// Output produced by every reset pulse once the `on_reset` queue is empty.
    pub fn on_every_reset(&self, data: &[u8]) {
        self.state.lock().reset_default = Some(data.to_vec());
    }

    /// Reply with `reply` whenever exactly `command` is written.
    pub fn on_write(&self, command: &[u8], reply: &[u8]) {
        self.state
            .lock()
            .write_replies
            .insert(command.to_vec(), reply.to_vec());
    }

    /// Expect a specific write operation.
    ///
    /// Use `verify_expectations()` to check that all expected writes occurred.
    pub fn expect_write(&self, data: &[u8]) {
        self.state.lock().expected_writes.push_back(data.to_vec());
    }

    /// Verify that all expected writes have occurred in order.
    pub fn verify_expectations(&self) -> Result<(), String> {
        let state = self.state.lock();

        if !state.expected_writes.is_empty() {
            return Err(format!(
                "Expected {} more write(s), but none occurred",
                state.expected_writes.len()
            ));
        }

        Ok(())
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Number of reset pulses seen so far.
    pub fn reset_count(&self) -> usize {
        self.state.lock().reset_count
    }

    /// Current (DTR, RTS) levels.
    pub fn control_lines(&self) -> (bool, bool) {
        let state = self.state.lock();
        (state.dtr, state.rts)
    }

    /// Make the next read or write fail as if the device was unplugged.
    pub fn fail_next(&self) {
        self.state.lock().should_fail = true;
    }

    /// Whether input was cleared since the last call, resetting the flag.
    pub fn take_input_cleared(&self) -> bool {
        std::mem::take(&mut self.state.lock().input_cleared)
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

fn disconnected() -> PortError {
    PortError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "Device disconnected",
    ))
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if std::mem::take(&mut state.should_fail) {
            return Err(disconnected());
        }

        state.write_log.push(data.to_vec());

        if let Some(expected) = state.expected_writes.pop_front() {
            if expected != data {
                return Err(PortError::config(format!(
                    "Expected write: {:?}, got: {:?}",
                    expected, data
                )));
            }
        }

        if let Some(reply) = state.write_replies.get(data).cloned() {
            state.read_queue.extend(reply);
        }

        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if std::mem::take(&mut state.should_fail) {
            return Err(disconnected());
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_input(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.input_cleared = true;
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), PortError> {
        self.state.lock().dtr = level;
        Ok(())
    }

    fn set_rts(&mut self, level: bool) -> Result<(), PortError> {
        let mut state = self.state.lock();
        let falling_edge = state.rts && !level;
        state.rts = level;

        if falling_edge {
            state.reset_count += 1;
            let output = state
                .reset_script
                .pop_front()
                .or_else(|| state.reset_default.clone());
            if let Some(output) = output {
                state.read_queue.extend(output);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
