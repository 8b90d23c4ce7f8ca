//! Response framing.
//!
//! Bytes arrive from the reader thread in arbitrary chunks. Per manufacturer
//! specification all responses terminate with `^`; everything before it is
//! one response.

use std::fmt;

use crate::command::decode_parameter;
use crate::constants::{NAK_MARKER, PAYLOAD_LEN, RESPONSE_TERMINATOR};
use crate::error::{Result, TecError};

/// One device response, without its terminator
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response(String);

impl Response {
    pub fn new(text: impl Into<String>) -> Self {
        Response(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// True when the device flagged the preceding command as bad
    pub fn is_nak(&self) -> bool {
        self.0.contains(NAK_MARKER)
    }

    /// The 4-digit data field following the leading `*`
    pub fn payload(&self) -> Result<&str> {
        self.0
            .get(1..1 + PAYLOAD_LEN)
            .ok_or_else(|| TecError::InvalidResponse(self.0.clone()))
    }

    /// Data field in hundredths, e.g. degrees C for a temperature read
    pub fn value(&self) -> Result<f64> {
        decode_parameter(self.payload()?)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accumulates bytes until a terminator completes a response
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: String,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns the completed response on a terminator.
    pub fn push(&mut self, byte: u8) -> Option<Response> {
        if byte == RESPONSE_TERMINATOR {
            Some(Response(std::mem::take(&mut self.buffer)))
        } else {
            self.buffer.push(byte as char);
            None
        }
    }

    /// Feed a chunk; returns every response it completed, in order.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Response> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Text received since the last terminator
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}
