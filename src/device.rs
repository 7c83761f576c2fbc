//! # Device Client
//!
//! Public operation set of the RS232-I2C bridge.
//!
//! Every operation is one request/response exchange. A single guard is held
//! for the whole exchange, so concurrent callers on the same client are
//! served one at a time and never see each other's responses. An operation
//! dropped mid-exchange leaves its response unread; the next exchange
//! discards that line before sending its own request.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::protocol::checksum::{ChecksumObserver, TracingObserver};
use crate::protocol::command::{self, Command};
use crate::protocol::frame::FrameTransport;
use crate::protocol::response::{self, decode_response_with};
use crate::serial::SerialTransport;

/// Handle to one bridge on one transport
pub struct DeviceClient<T> {
    link: Mutex<FrameTransport<T>>,
    observer: Arc<dyn ChecksumObserver>,
}

impl<T> std::fmt::Debug for DeviceClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient").finish_non_exhaustive()
    }
}

impl<T: SerialTransport> DeviceClient<T> {
    /// Create a client that waits indefinitely for responses
    pub fn new(transport: T) -> Self {
        Self::from_link(FrameTransport::new(transport))
    }

    /// Create a client whose reads give up after `timeout`
    pub fn with_read_timeout(transport: T, timeout: Duration) -> Self {
        Self::from_link(FrameTransport::with_read_timeout(transport, timeout))
    }

    fn from_link(link: FrameTransport<T>) -> Self {
        Self {
            link: Mutex::new(link),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observer notified about response checksum mismatches
    pub fn with_observer(mut self, observer: Arc<dyn ChecksumObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run one request/response exchange under the guard
    async fn exchange(&self, command: Command, body: &str) -> Result<Vec<u8>> {
        let mut link = self.link.lock().await;

        link.write_request(body).await?;
        let line = link.read_response_line().await?;
        let data = decode_response_with(command.byte(), &line, self.observer.as_ref())?;

        debug!(?command, len = data.len(), "Exchange complete");
        Ok(data)
    }

    /// Read `count` bytes from the slave at `addr`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(data))` - exactly `count` bytes were read
    /// * `Ok(None)` - the slave did not acknowledge
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a malformed response, a device
    /// error report, or a response whose echoed fields or data length do
    /// not match the request
    pub async fn read_i2c(&self, addr: u8, count: u8) -> Result<Option<Vec<u8>>> {
        let data = self
            .exchange(Command::ReadI2c, &command::read_i2c(addr, count))
            .await?;
        response::parse_read_i2c(addr, count, &data)
    }

    /// Write `data` to the slave at `addr`
    ///
    /// Returns `false` when the slave did not acknowledge.
    pub async fn write_i2c(&self, addr: u8, data: &[u8]) -> Result<bool> {
        let response = self
            .exchange(Command::WriteI2c, &command::write_i2c(addr, data))
            .await?;
        response::parse_write_i2c(addr, &response)
    }

    /// Check whether a slave acknowledges `addr`
    pub async fn check_slave_address(&self, addr: u8) -> Result<bool> {
        let data = self
            .exchange(Command::CheckSlaveAddress, &command::check_slave_address(addr))
            .await?;
        response::parse_check_slave_address(addr, &data)
    }

    /// List the addresses of all slaves on the bus
    pub async fn scan_i2c(&self) -> Result<Vec<u8>> {
        let data = self.exchange(Command::ScanI2c, &command::scan_i2c()).await?;
        response::parse_scan_i2c(&data)
    }

    /// Current SCL clock frequency in Hz
    pub async fn get_scl_frequency(&self) -> Result<u32> {
        let data = self
            .exchange(Command::GetSclFrequency, &command::get_scl_frequency())
            .await?;
        response::parse_scl_frequency(Command::GetSclFrequency, &data)
    }

    /// Set the SCL clock frequency in Hz
    ///
    /// Returns the frequency the bridge confirmed, which may differ from the
    /// requested one.
    pub async fn set_scl_frequency(&self, freq: u32) -> Result<u32> {
        let data = self
            .exchange(Command::SetSclFrequency, &command::set_scl_frequency(freq))
            .await?;
        response::parse_scl_frequency(Command::SetSclFrequency, &data)
    }

    /// Close the transport
    pub async fn close(self) -> Result<()> {
        let mut link = self.link.into_inner();
        link.shutdown().await?;
        debug!("Transport closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::protocol::checksum::{compute, MismatchEvent};
    use crate::protocol::frame::encode_frame;
    use std::sync::Mutex as StdMutex;
    use tokio_test::io::Builder;

    /// Response line with checksum and terminator
    fn reply(body: &str) -> Vec<u8> {
        format!("{}{:02X}\r", body, compute(body).unwrap()).into_bytes()
    }

    fn request(body: &str) -> Vec<u8> {
        encode_frame(body).unwrap().into_bytes()
    }

    #[derive(Default)]
    struct RecordingObserver {
        frames: StdMutex<Vec<String>>,
    }

    impl ChecksumObserver for RecordingObserver {
        fn checksum_mismatch(&self, event: &MismatchEvent<'_>) {
            self.frames.lock().unwrap().push(event.frame.to_string());
        }
    }

    #[tokio::test]
    async fn test_scan_i2c() {
        let mock = Builder::new()
            .write(b"CBD\r")
            .read(b"4302506864\r")
            .build();
        let device = DeviceClient::new(mock);

        assert_eq!(device.scan_i2c().await.unwrap(), vec![0x50, 0x68]);
    }

    #[tokio::test]
    async fn test_scan_i2c_empty_bus() {
        let mock = Builder::new()
            .write(b"CBD\r")
            .read(b"430039\r")
            .build();
        let device = DeviceClient::new(mock);

        assert!(device.scan_i2c().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_i2c() {
        let mock = Builder::new()
            .write(b"R5002E7\r")
            .read(b"520150AABB026B\r")
            .build();
        let device = DeviceClient::new(mock);

        assert_eq!(device.read_i2c(0x50, 2).await.unwrap(), Some(vec![0xAA, 0xBB]));
    }

    #[tokio::test]
    async fn test_read_i2c_nack() {
        let mock = Builder::new()
            .write(b"R5002E7\r")
            .read(b"5200500272\r")
            .build();
        let device = DeviceClient::new(mock);

        assert_eq!(device.read_i2c(0x50, 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_i2c_short_data_is_error() {
        let mock = Builder::new()
            .write(&request("R5002"))
            .read(&reply("520150AA02"))
            .build();
        let device = DeviceClient::new(mock);

        assert!(matches!(
            device.read_i2c(0x50, 2).await,
            Err(BridgeError::ReadCountMismatch { expected: 2, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn test_write_i2c() {
        let mock = Builder::new()
            .write(b"wC4A11F225CB0DB\r")
            .read(b"7701C4BA\r")
            .build();
        let device = DeviceClient::new(mock);

        assert!(device.write_i2c(0xC4, &[0xA1, 0x1F, 0x22, 0x5C, 0xB0]).await.unwrap());
    }

    #[tokio::test]
    async fn test_write_i2c_nack() {
        let mock = Builder::new()
            .write(&request("wC4A11F225CB0"))
            .read(b"7700C4BB\r")
            .build();
        let device = DeviceClient::new(mock);

        assert!(!device.write_i2c(0xC4, &[0xA1, 0x1F, 0x22, 0x5C, 0xB0]).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_slave_address() {
        let mock = Builder::new()
            .write(b"c5038\r")
            .read(&reply("635001"))
            .write(b"c5038\r")
            .read(&reply("635000"))
            .build();
        let device = DeviceClient::new(mock);

        assert!(device.check_slave_address(0x50).await.unwrap());
        assert!(!device.check_slave_address(0x50).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_scl_frequency() {
        let mock = Builder::new()
            .write(b"IB7\r")
            .read(&reply("49A0860100"))
            .build();
        let device = DeviceClient::new(mock);

        assert_eq!(device.get_scl_frequency().await.unwrap(), 100_000);
    }

    #[tokio::test]
    async fn test_set_scl_frequency() {
        let mock = Builder::new()
            .write(&request("E801A0600"))
            .read(&reply("45801A0600"))
            .build();
        let device = DeviceClient::new(mock);

        assert_eq!(device.set_scl_frequency(400_000).await.unwrap(), 400_000);
    }

    #[tokio::test]
    async fn test_device_reported_errors() {
        let mock = Builder::new()
            .write(b"CBD\r")
            .read(b"730135\r")
            .write(b"CBD\r")
            .read(b"FF0014\r")
            .write(b"CBD\r")
            .read(b"700138\r")
            .build();
        let device = DeviceClient::new(mock);

        let err = device.scan_i2c().await.unwrap_err();
        assert!(matches!(err, BridgeError::DeviceChecksumError));
        assert!(err.is_device_reported());

        assert!(matches!(device.scan_i2c().await, Err(BridgeError::UnknownCommand)));
        assert!(matches!(device.scan_i2c().await, Err(BridgeError::InterruptDetected)));
    }

    #[tokio::test]
    async fn test_command_mismatch() {
        let mock = Builder::new()
            .write(b"IB7\r")
            .read(b"7701C4BA\r")
            .build();
        let device = DeviceClient::new(mock);

        assert!(matches!(
            device.get_scl_frequency().await,
            Err(BridgeError::CommandMismatch { expected: 0x49, actual: 0x77 })
        ));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_notifies_observer() {
        let observer = Arc::new(RecordingObserver::default());
        let mock = Builder::new()
            .write(b"CBD\r")
            .read(b"4302506865\r")
            .build();
        let device = DeviceClient::new(mock).with_observer(observer.clone());

        assert!(matches!(device.scan_i2c().await, Err(BridgeError::ChecksumMismatch)));
        assert_eq!(*observer.frames.lock().unwrap(), vec!["4302506865".to_string()]);
    }

    #[tokio::test]
    async fn test_timeout_yields_invalid_checksum() {
        let mock = Builder::new()
            .write(b"CBD\r")
            .wait(Duration::from_secs(5))
            .build();
        let device = DeviceClient::with_read_timeout(mock, Duration::from_millis(20));

        assert!(matches!(device.scan_i2c().await, Err(BridgeError::InvalidChecksum)));
    }

    #[tokio::test]
    async fn test_end_of_stream_yields_invalid_checksum() {
        let mock = Builder::new().write(b"IB7\r").build();
        let device = DeviceClient::new(mock);

        assert!(matches!(
            device.get_scl_frequency().await,
            Err(BridgeError::InvalidChecksum)
        ));
    }

    #[tokio::test]
    async fn test_guard_released_after_error() {
        let mock = Builder::new()
            .write(b"IB7\r")
            .read(b"4900\r")
            .write(b"IB7\r")
            .read(&reply("49A0860100"))
            .build();
        let device = DeviceClient::new(mock);

        assert!(device.get_scl_frequency().await.is_err());
        assert_eq!(device.get_scl_frequency().await.unwrap(), 100_000);
    }

    #[tokio::test]
    async fn test_concurrent_operations_are_serialized() {
        let mock = Builder::new()
            .write(b"IB7\r")
            .read(&reply("49A0860100"))
            .write(b"IB7\r")
            .read(&reply("49A0860100"))
            .build();
        let device = Arc::new(DeviceClient::new(mock));

        let a = tokio::spawn({
            let device = device.clone();
            async move { device.get_scl_frequency().await }
        });
        let b = tokio::spawn({
            let device = device.clone();
            async move { device.get_scl_frequency().await }
        });

        assert_eq!(a.await.unwrap().unwrap(), 100_000);
        assert_eq!(b.await.unwrap().unwrap(), 100_000);
    }

    #[tokio::test]
    async fn test_cancelled_operation_response_is_discarded() {
        let mock = Builder::new()
            .write(b"R5002E7\r")
            .wait(Duration::from_millis(50))
            .read(&reply("520150AABB02"))
            .write(b"R5002E7\r")
            .read(&reply("520150CCDD02"))
            .build();
        let device = DeviceClient::new(mock);

        let first = tokio::time::timeout(Duration::from_millis(10), device.read_i2c(0x50, 2)).await;
        assert!(first.is_err());

        assert_eq!(device.read_i2c(0x50, 2).await.unwrap(), Some(vec![0xCC, 0xDD]));
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let mock = Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "port gone"))
            .build();
        let device = DeviceClient::new(mock);

        match device.scan_i2c().await {
            Err(BridgeError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("Expected Io error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close() {
        let mock = Builder::new().build();
        let device = DeviceClient::new(mock);

        device.close().await.unwrap();
    }
}
