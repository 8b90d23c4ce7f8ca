//! # TC-720 Protocol Library
//!
//! A Rust library for driving a TC-720 thermoelectric cooler (TEC) controller
//! over its serial ASCII command/response protocol.
//!
//! ## Features
//!
//! - Encode commands with the manufacturer checksum (`*` + opcode + payload + checksum + CR)
//! - Reassemble `^`-terminated responses delivered asynchronously by a reader thread
//! - One outstanding command at a time, with bounded resends when the device NAKs
//! - Connect sequence that disables the output and applies PID tuning
//! - Setpoint tracking and a temperature-settled check
//!
//! ## Example
//!
//! ```no_run
//! use tc720_protocol::Tec;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tec = Tec::connect("/dev/ttyUSB0")?;
//!     tec.enable()?;
//!     tec.set_temperature(25.0)?;
//!     println!("TEC temperature: {:.2}C", tec.read_temperature_value()?);
//!     tec.close_port()?;
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod command;
pub mod constants;
pub mod correlator;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod transport;
pub mod types;

pub use command::{Command, Opcode};
pub use correlator::{Correlator, ResponseSlot, RetryPolicy};
pub use error::{Result, TecError};
pub use frame::{FrameAssembler, Response};
pub use protocol::Tec;
pub use transport::{ByteListener, PortSettings, SerialTransport, Transport};
pub use types::*;
