//! Protocol constants for TC-720 communication.
//!
//! This module defines all the constants used in the TC-720 ASCII protocol,
//! including opcodes, frame delimiters, timing parameters, and serial port
//! configuration.

/// Opcode: write the fixed desired control setting (temperature setpoint)
pub const SET_TEMPERATURE_CODE: &str = "1c";

/// Opcode: read the input 1 temperature
pub const READ_TEMPERATURE_CODE: &str = "01";

/// Opcode: write the output enable flag
pub const OUTPUT_ENABLE_CODE: &str = "30";

/// Opcode: write the proportional bandwidth (the "P" of PID)
pub const PROPORTIONAL_BANDWIDTH_CODE: &str = "1d";

/// Opcode: write the integral gain (the "I" of PID)
pub const INTEGRAL_GAIN_CODE: &str = "1e";

/// Opcode: write the derivative gain (the "D" of PID)
pub const DERIVATIVE_GAIN_CODE: &str = "1f";

/// Start-of-command character
pub const COMMAND_START: char = '*';

/// End-of-command character
pub const COMMAND_END: char = '\r';

/// Every device response ends with this byte
pub const RESPONSE_TERMINATOR: u8 = b'^';

/// Marker the device embeds in a response when it rejected the command
pub const NAK_MARKER: char = 'X';

/// Width of the opcode field
pub const OPCODE_LEN: usize = 2;

/// Width of the hex payload field
pub const PAYLOAD_LEN: usize = 4;

/// Width of the opcode + payload body the checksum is computed over
pub const BODY_LEN: usize = OPCODE_LEN + PAYLOAD_LEN;

/// Width of the checksum field
pub const CHECKSUM_LEN: usize = 2;

/// Real-valued parameters travel as hundredths
pub const PARAMETER_SCALE: f64 = 100.0;

/// Added before truncating a scaled parameter; far above the rounding error
/// of `value * 100` and far below one hundredth
pub const SCALE_EPSILON: f64 = 1e-6;

/// Baud rate (230400 bps)
pub const BAUD_RATE: u32 = 230_400;

/// Data bits configuration
pub const DATA_BITS: serialport::DataBits = serialport::DataBits::Eight;

/// Stop bits configuration
pub const STOP_BITS: serialport::StopBits = serialport::StopBits::One;

/// Parity configuration
pub const PARITY: serialport::Parity = serialport::Parity::None;

/// Port read timeout used by the reader thread between stop-flag checks
pub const READ_POLL_MS: u64 = 50;

/// How long to wait for a framed response before giving up
pub const RESPONSE_TIMEOUT_MS: u64 = 2000;

/// Maximum number of writes of one command when the device keeps NAKing it
pub const MAX_SEND_ATTEMPTS: u32 = 5;

/// Factory default is 5C
pub const PROPORTIONAL_BANDWIDTH: f64 = 2.25;

/// Factory default is 1
pub const INTEGRAL_GAIN: f64 = 1.0;

/// Factory default is 0
pub const DERIVATIVE_GAIN: f64 = 10.0;

/// Percent deviation below which the temperature counts as settled
pub const SETTLED_HYSTERESIS_PERCENT: f64 = 0.2;
