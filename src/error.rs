//! Error types for TC-720 protocol operations.

use thiserror::Error;

/// Result type alias for TC-720 operations.
pub type Result<T> = std::result::Result<T, TecError>;

/// Error types for TC-720 controller communication.
#[derive(Error, Debug)]
pub enum TecError {
    /// Serial port communication error
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure that is not a plain serial or I/O error
    #[error("Transport error: {0}")]
    Transport(String),

    /// The port has been closed, or the reader stopped delivering bytes
    #[error("Not connected")]
    Disconnected,

    /// No framed response arrived in time
    #[error("Communication timeout after {waited_ms} ms")]
    Timeout {
        /// How long the caller waited
        waited_ms: u64,
    },

    /// Command body had the wrong number of characters
    #[error("Incorrect command length: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Required length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Command frame is not `*` + body + checksum + CR
    #[error("Invalid frame: {0:?}")]
    InvalidFrame(String),

    /// Frame checksum does not match its body
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum computed from the body
        expected: String,
        /// Checksum carried by the frame
        actual: String,
    },

    /// Two-character code that is not one of the known opcodes
    #[error("Unknown opcode: {0:?}")]
    UnknownOpcode(String),

    /// Parameter does not fit the 4-hex-digit payload
    #[error("Value out of range: {value} does not fit a 4-digit hex payload")]
    ValueOutOfRange {
        /// Value that was requested
        value: f64,
    },

    /// Device kept rejecting the command
    #[error("Command rejected by device after {attempts} attempts")]
    Rejected {
        /// Number of writes that were NAKed
        attempts: u32,
    },

    /// Response didn't carry the expected data
    #[error("Invalid response: {0:?}")]
    InvalidResponse(String),

    /// Temperature set while the output is disabled
    #[error("Cannot set temperature to {requested} with output disabled")]
    NotEnabled {
        /// Setpoint that was requested
        requested: f64,
    },

    /// Settling was queried before any setpoint was written
    #[error("Temperature setpoint has not been set")]
    SetpointUnset,
}
