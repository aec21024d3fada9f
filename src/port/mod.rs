//! Port abstraction layer for serial communication.
//!
//! Raw byte I/O sits behind `SerialPortAdapter` so the same line transport can
//! drive real boards or the scripted mock.

pub mod error;
pub mod line;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use line::{LineTransport, TimeoutGuard, DEFAULT_RESET_PULSE};
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::*;
