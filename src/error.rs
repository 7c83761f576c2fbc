//! # Error Types
//!
//! Custom error types for the RS232-I2C bridge using `thiserror`.

use thiserror::Error;

/// Main error type for the RS232-I2C bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A frame body contained a character above 0x7F
    #[error("non-ASCII character found in input")]
    NonAsciiInput,

    /// Frame too short or trailing checksum field is not hex
    #[error("invalid checksum")]
    InvalidChecksum,

    /// Checksum field does not match the computed value
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Response body is not valid hex or decodes to nothing
    #[error("invalid response")]
    InvalidResponse,

    /// Device reported an interrupt (sentinel 0x70 0x01)
    #[error("interrupt detected")]
    InterruptDetected,

    /// Device rejected our frame checksum (sentinel 0x73 0x01)
    #[error("checksum error reported by device")]
    DeviceChecksumError,

    /// Device did not recognise the command (sentinel 0xFF 0x00)
    #[error("unknown command")]
    UnknownCommand,

    /// Response does not echo the issued command
    #[error("command mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    CommandMismatch { expected: u8, actual: u8 },

    /// Response has the wrong number of bytes for the command
    #[error("invalid response length {len} for command '{command}'")]
    ResponseLength { command: char, len: usize },

    /// Response echoes a different slave address
    #[error("invalid response, slave address mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    SlaveAddressMismatch { expected: u8, actual: u8 },

    /// Response echoes a different byte count
    #[error("invalid response, count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// Read succeeded but returned a different amount of data
    #[error("invalid response, read count mismatch: expected {expected}, got {actual}")]
    ReadCountMismatch { expected: usize, actual: usize },

    /// Result code other than 0x00/0x01
    #[error("invalid response, unknown result code 0x{0:02X}")]
    UnknownResultCode(u8),

    /// 7-bit I2C address expected
    #[error("address out of range: 0x{0:X}")]
    AddressOutOfRange(u16),

    /// The bridge reads at most 255 bytes per transaction
    #[error("read length out of range: {0}")]
    ReadLengthOutOfRange(usize),

    /// Bus speed does not fit the bridge's 32-bit frequency field
    #[error("invalid speed: {0} Hz")]
    InvalidSpeed(u64),

    /// Device reported that the read was not acknowledged
    #[error("failed to read data")]
    ReadFailed,

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// True for errors signalled by the bridge itself through a sentinel
    /// response, as opposed to errors detected on the host.
    pub fn is_device_reported(&self) -> bool {
        matches!(
            self,
            BridgeError::InterruptDetected
                | BridgeError::DeviceChecksumError
                | BridgeError::UnknownCommand
        )
    }
}

/// Result type alias for the RS232-I2C bridge
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_reported_errors() {
        assert!(BridgeError::InterruptDetected.is_device_reported());
        assert!(BridgeError::DeviceChecksumError.is_device_reported());
        assert!(BridgeError::UnknownCommand.is_device_reported());

        assert!(!BridgeError::ChecksumMismatch.is_device_reported());
        assert!(!BridgeError::InvalidResponse.is_device_reported());
        assert!(!BridgeError::CommandMismatch { expected: 0x52, actual: 0x77 }.is_device_reported());
    }

    #[test]
    fn test_error_messages() {
        let err = BridgeError::CommandMismatch { expected: 0x52, actual: 0x77 };
        assert_eq!(err.to_string(), "command mismatch: expected 0x52, got 0x77");

        let err = BridgeError::ResponseLength { command: 'I', len: 3 };
        assert_eq!(err.to_string(), "invalid response length 3 for command 'I'");

        let err = BridgeError::AddressOutOfRange(0x80);
        assert_eq!(err.to_string(), "address out of range: 0x80");
    }
}
