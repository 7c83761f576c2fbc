//! # Frame Checksum
//!
//! Additive checksum used by the RS232-I2C bridge.
//!
//! **Algorithm**: `(0x100 - sum of character codes) mod 256`
//! **Wire format**: 2 uppercase hex digits following the body

use crate::error::{BridgeError, Result};
use tracing::warn;

/// Details of a checksum mismatch, handed to a [`ChecksumObserver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MismatchEvent<'a> {
    /// Complete line as received, checksum field included
    pub frame: &'a str,
    /// Checksum computed over the body
    pub expected: u8,
    /// Checksum carried by the frame
    pub actual: u8,
}

/// Receives diagnostics when a frame fails checksum verification
pub trait ChecksumObserver: Send + Sync {
    fn checksum_mismatch(&self, event: &MismatchEvent<'_>);
}

/// Observer that emits a `tracing` warning for every mismatch
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ChecksumObserver for TracingObserver {
    fn checksum_mismatch(&self, event: &MismatchEvent<'_>) {
        warn!(
            frame = event.frame,
            expected = %format!("{:02X}", event.expected),
            actual = %format!("{:02X}", event.actual),
            "Checksum mismatch"
        );
    }
}

struct SilentObserver;

impl ChecksumObserver for SilentObserver {
    fn checksum_mismatch(&self, _event: &MismatchEvent<'_>) {}
}

/// Calculate the checksum of a frame body
///
/// # Arguments
///
/// * `s` - Frame body (command letter and hex parameters)
///
/// # Returns
///
/// * `Result<u8>` - Checksum byte
///
/// # Errors
///
/// Returns `NonAsciiInput` if any character code exceeds 127
///
/// # Examples
///
/// ```
/// use rs232_i2c::protocol::checksum::compute;
///
/// assert_eq!(compute("7701C4").unwrap(), 0xBA);
/// ```
pub fn compute(s: &str) -> Result<u8> {
    let mut sum: u8 = 0;

    for c in s.chars() {
        if c as u32 > 0x7F {
            return Err(BridgeError::NonAsciiInput);
        }
        sum = sum.wrapping_add(c as u8);
    }

    Ok(0u8.wrapping_sub(sum))
}

/// Verify a line carrying a trailing checksum and return its body
///
/// An empty body is valid: `"00"` verifies to `""`.
///
/// # Errors
///
/// * `InvalidChecksum` - fewer than 2 characters, or the last 2 are not hex
/// * `ChecksumMismatch` - checksum field differs from the computed value
/// * `NonAsciiInput` - body contains non-ASCII characters
pub fn verify(s: &str) -> Result<&str> {
    verify_with(s, &SilentObserver)
}

/// Verify like [`verify`], reporting mismatch details to `observer`
pub fn verify_with<'a>(s: &'a str, observer: &dyn ChecksumObserver) -> Result<&'a str> {
    if s.len() < 2 {
        return Err(BridgeError::InvalidChecksum);
    }

    let split = s.len() - 2;
    let checksum_part = s.get(split..).ok_or(BridgeError::InvalidChecksum)?;
    if !checksum_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BridgeError::InvalidChecksum);
    }
    let actual =
        u8::from_str_radix(checksum_part, 16).map_err(|_| BridgeError::InvalidChecksum)?;

    let data_part = &s[..split];
    let expected = compute(data_part)?;

    if actual != expected {
        observer.checksum_mismatch(&MismatchEvent {
            frame: s,
            expected,
            actual,
        });
        return Err(BridgeError::ChecksumMismatch);
    }

    Ok(data_part)
}
