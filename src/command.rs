//! Command encoding.
//!
//! A command travels as `*` + opcode (2) + payload (4) + checksum (2) + CR,
//! all hex digits lowercase and zero padded.

use std::fmt;

use crate::checksum::{checksum, validate};
use crate::constants::*;
use crate::error::{Result, TecError};

/// Operations understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    SetTemperature,
    ReadTemperature,
    OutputEnable,
    ProportionalBandwidth,
    IntegralGain,
    DerivativeGain,
}

impl Opcode {
    /// Two-character wire code
    pub fn code(self) -> &'static str {
        match self {
            Opcode::SetTemperature => SET_TEMPERATURE_CODE,
            Opcode::ReadTemperature => READ_TEMPERATURE_CODE,
            Opcode::OutputEnable => OUTPUT_ENABLE_CODE,
            Opcode::ProportionalBandwidth => PROPORTIONAL_BANDWIDTH_CODE,
            Opcode::IntegralGain => INTEGRAL_GAIN_CODE,
            Opcode::DerivativeGain => DERIVATIVE_GAIN_CODE,
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            SET_TEMPERATURE_CODE => Ok(Opcode::SetTemperature),
            READ_TEMPERATURE_CODE => Ok(Opcode::ReadTemperature),
            OUTPUT_ENABLE_CODE => Ok(Opcode::OutputEnable),
            PROPORTIONAL_BANDWIDTH_CODE => Ok(Opcode::ProportionalBandwidth),
            INTEGRAL_GAIN_CODE => Ok(Opcode::IntegralGain),
            DERIVATIVE_GAIN_CODE => Ok(Opcode::DerivativeGain),
            _ => Err(TecError::UnknownOpcode(code.to_string())),
        }
    }
}

/// Render a real-valued parameter as a 4-digit hex payload.
///
/// The value is multiplied by 100 and truncated toward zero, after absorbing
/// binary representation error so that e.g. 0.29 encodes as 29, not 28.
/// Negative, non-finite, and oversized values are rejected instead of
/// wrapping.
pub fn encode_parameter(value: f64) -> Result<String> {
    let scaled = (value * PARAMETER_SCALE + SCALE_EPSILON).trunc();
    if !scaled.is_finite() || scaled < 0.0 || scaled > u16::MAX as f64 {
        return Err(TecError::ValueOutOfRange { value });
    }
    Ok(format!("{:0width$x}", scaled as u16, width = PAYLOAD_LEN))
}

/// Inverse of [`encode_parameter`]: 4 hex digits to a real value.
pub fn decode_parameter(payload: &str) -> Result<f64> {
    if payload.len() != PAYLOAD_LEN || !payload.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TecError::InvalidResponse(payload.to_string()));
    }
    let raw = u16::from_str_radix(payload, 16)
        .map_err(|_| TecError::InvalidResponse(payload.to_string()))?;
    Ok(raw as f64 / PARAMETER_SCALE)
}

/// A fully encoded command, ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    payload: String,
    checksum: String,
}

impl Command {
    /// Command carrying a real-valued parameter in hundredths
    pub fn with_value(opcode: Opcode, value: f64) -> Result<Self> {
        Self::from_payload(opcode, encode_parameter(value)?)
    }

    /// Command carrying an integer payload as-is, e.g. output enable `0001`
    pub fn raw(opcode: Opcode, value: u16) -> Result<Self> {
        Self::from_payload(opcode, format!("{:0width$x}", value, width = PAYLOAD_LEN))
    }

    /// Read commands carry a zero payload
    pub fn read(opcode: Opcode) -> Result<Self> {
        Self::raw(opcode, 0)
    }

    fn from_payload(opcode: Opcode, payload: String) -> Result<Self> {
        let checksum = checksum(&format!("{}{}", opcode.code(), payload))?;
        Ok(Command {
            opcode,
            payload,
            checksum,
        })
    }

    /// Parse a wire frame, verifying its checksum
    pub fn parse(frame: &str) -> Result<Self> {
        let inner = frame
            .strip_prefix(COMMAND_START)
            .and_then(|rest| rest.strip_suffix(COMMAND_END))
            .ok_or_else(|| TecError::InvalidFrame(frame.to_string()))?;
        if !inner.is_ascii() || inner.len() != BODY_LEN + CHECKSUM_LEN {
            return Err(TecError::InvalidFrame(frame.to_string()));
        }

        let (body, claimed) = inner.split_at(BODY_LEN);
        if !validate(body, claimed)? {
            return Err(TecError::ChecksumMismatch {
                expected: checksum(body)?,
                actual: claimed.to_string(),
            });
        }

        let (code, payload) = body.split_at(OPCODE_LEN);
        if !payload.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(TecError::InvalidFrame(frame.to_string()));
        }
        Ok(Command {
            opcode: Opcode::from_code(code)?,
            payload: payload.to_string(),
            checksum: claimed.to_string(),
        })
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Opcode + payload, the part the checksum covers
    pub fn body(&self) -> String {
        format!("{}{}", self.opcode.code(), self.payload)
    }

    /// Payload interpreted as a real value
    pub fn value(&self) -> Result<f64> {
        decode_parameter(&self.payload)
    }

    /// Complete frame including delimiters
    pub fn frame(&self) -> String {
        format!(
            "{}{}{}{}",
            COMMAND_START,
            self.body(),
            self.checksum,
            COMMAND_END
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*{}{}", self.body(), self.checksum)
    }
}
