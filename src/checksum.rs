//! Command checksum.
//!
//! Per manufacturer specification every command body is accompanied by a
//! checksum: each character is taken as its hex character code, those values
//! are summed, and the two least significant hex digits of the sum are sent
//! as lowercase text. See Appendix B of the TC-720 manual.

use crate::constants::{BODY_LEN, CHECKSUM_LEN};
use crate::error::{Result, TecError};

/// Compute the two-digit checksum of a six-character command body.
pub fn checksum(body: &str) -> Result<String> {
    let length = body.chars().count();
    if length != BODY_LEN {
        return Err(TecError::LengthMismatch {
            expected: BODY_LEN,
            actual: length,
        });
    }

    let sum: u32 = body.chars().map(|c| c as u32).sum();
    let digits = format!("{:x}", sum);
    let tail = &digits[digits.len().saturating_sub(CHECKSUM_LEN)..];
    Ok(format!("{:0>width$}", tail, width = CHECKSUM_LEN))
}

/// Check a claimed checksum against the one computed for `body`.
pub fn validate(body: &str, claimed: &str) -> Result<bool> {
    Ok(checksum(body)? == claimed)
}
