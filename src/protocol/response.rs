//! # Response Decoder
//!
//! Decodes response lines from the bridge and validates the per-command
//! response layouts.

use super::checksum::{verify, verify_with, ChecksumObserver};
use super::command::Command;
use crate::error::{BridgeError, Result};

/// Leading byte of an interrupt report
pub const SENTINEL_INTERRUPT: u8 = 0x70;

/// Leading byte of a device-side checksum failure
pub const SENTINEL_CHECKSUM: u8 = 0x73;

/// Leading byte of an unknown-command report
pub const SENTINEL_UNKNOWN_COMMAND: u8 = 0xFF;

/// Result code: slave did not acknowledge
pub const RESULT_NACK: u8 = 0x00;

/// Result code: operation succeeded
pub const RESULT_ACK: u8 = 0x01;

/// Map a device error report to its error, if `data` is one
pub fn classify_sentinel(data: &[u8]) -> Option<BridgeError> {
    match (data.first()?, data.get(1)?) {
        (&SENTINEL_INTERRUPT, &0x01) => Some(BridgeError::InterruptDetected),
        (&SENTINEL_CHECKSUM, &0x01) => Some(BridgeError::DeviceChecksumError),
        (&SENTINEL_UNKNOWN_COMMAND, &0x00) => Some(BridgeError::UnknownCommand),
        _ => None,
    }
}

/// Verify and decode a response line
///
/// # Arguments
///
/// * `command` - Command byte the response must echo
/// * `line` - Response line without the carriage return
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Decoded bytes, starting with the command byte
///
/// # Errors
///
/// Returns error if:
/// - The checksum is malformed or wrong
/// - The body is not hex or is empty
/// - The bridge answered with an error sentinel
/// - The response belongs to a different command
///
/// # Examples
///
/// ```
/// use rs232_i2c::protocol::response::decode_response;
///
/// let data = decode_response(0x77, "7701C4BA").unwrap();
/// assert_eq!(data, vec![0x77, 0x01, 0xC4]);
/// ```
pub fn decode_response(command: u8, line: &str) -> Result<Vec<u8>> {
    decode_body(command, verify(line)?)
}

/// Decode like [`decode_response`], reporting checksum mismatches to `observer`
pub fn decode_response_with(
    command: u8,
    line: &str,
    observer: &dyn ChecksumObserver,
) -> Result<Vec<u8>> {
    decode_body(command, verify_with(line, observer)?)
}

fn decode_body(command: u8, body: &str) -> Result<Vec<u8>> {
    let data = hex::decode(body).map_err(|_| BridgeError::InvalidResponse)?;
    if data.is_empty() {
        return Err(BridgeError::InvalidResponse);
    }

    if let Some(err) = classify_sentinel(&data) {
        return Err(err);
    }

    if data[0] != command {
        return Err(BridgeError::CommandMismatch {
            expected: command,
            actual: data[0],
        });
    }

    Ok(data)
}

fn result_code(code: u8) -> Result<bool> {
    match code {
        RESULT_NACK => Ok(false),
        RESULT_ACK => Ok(true),
        other => Err(BridgeError::UnknownResultCode(other)),
    }
}

fn check_address(expected: u8, actual: u8) -> Result<()> {
    if expected != actual {
        return Err(BridgeError::SlaveAddressMismatch { expected, actual });
    }
    Ok(())
}

fn length_error(command: Command, data: &[u8]) -> BridgeError {
    BridgeError::ResponseLength {
        command: command.letter(),
        len: data.len(),
    }
}

/// Parse a read response: `[cmd, code, addr, data.., count]`
///
/// Returns `None` when the slave did not acknowledge.
pub fn parse_read_i2c(addr: u8, count: u8, data: &[u8]) -> Result<Option<Vec<u8>>> {
    if data.len() < 3 {
        return Err(length_error(Command::ReadI2c, data));
    }

    let code = data[1];
    check_address(addr, data[2])?;

    let echoed_count = data[data.len() - 1];
    if echoed_count != count {
        return Err(BridgeError::CountMismatch {
            expected: count as usize,
            actual: echoed_count as usize,
        });
    }

    if !result_code(code)? {
        return Ok(None);
    }

    // A three byte response has no data field, its last byte is the address
    let payload: &[u8] = if data.len() > 3 { &data[3..data.len() - 1] } else { &[] };
    if payload.len() != count as usize {
        return Err(BridgeError::ReadCountMismatch {
            expected: count as usize,
            actual: payload.len(),
        });
    }

    Ok(Some(payload.to_vec()))
}

/// Parse a write response: `[cmd, code, addr]`
pub fn parse_write_i2c(addr: u8, data: &[u8]) -> Result<bool> {
    if data.len() != 3 {
        return Err(length_error(Command::WriteI2c, data));
    }

    check_address(addr, data[2])?;
    result_code(data[1])
}

/// Parse an address check response: `[cmd, addr, code]`
pub fn parse_check_slave_address(addr: u8, data: &[u8]) -> Result<bool> {
    if data.len() != 3 {
        return Err(length_error(Command::CheckSlaveAddress, data));
    }

    check_address(addr, data[1])?;
    result_code(data[2])
}

/// Parse a scan response: `[cmd, count, addrs..]`
pub fn parse_scan_i2c(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 2 {
        return Err(length_error(Command::ScanI2c, data));
    }

    let count = data[1] as usize;
    let addresses = &data[2..];
    if addresses.len() != count {
        return Err(BridgeError::CountMismatch {
            expected: count,
            actual: addresses.len(),
        });
    }

    Ok(addresses.to_vec())
}

/// Parse a frequency response: `[cmd, f0, f1, f2, f3]`, little-endian
pub fn parse_scl_frequency(command: Command, data: &[u8]) -> Result<u32> {
    match data {
        [_, b0, b1, b2, b3] => Ok(u32::from_le_bytes([*b0, *b1, *b2, *b3])),
        _ => Err(length_error(command, data)),
    }
}
