//! # I2C Bus Adapter
//!
//! Generic I2C transaction interface backed by the RS232-I2C bridge.
//!
//! This module handles:
//! - Range checks on addresses and read lengths before any serial I/O
//! - Combined write-then-read transactions
//! - Bus speed changes
//! - Sharing opened buses by name through [`BusRegistry`]

pub mod registry;

pub use registry::BusRegistry;

use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::device::DeviceClient;
use crate::error::{BridgeError, Result};
use crate::serial::SerialTransport;

/// Highest 7-bit I2C address plus one
pub const MAX_ADDRESS: u16 = 0x80;

/// Largest read the bridge can report in its one-byte count field
pub const MAX_READ_LEN: usize = 255;

/// Gap between the write and read phases of a combined transaction
pub const WRITE_READ_GAP: Duration = Duration::from_millis(1);

/// Named I2C bus on top of a [`DeviceClient`]
pub struct I2cBus<T> {
    name: String,
    device: DeviceClient<T>,
}

impl<T> fmt::Debug for I2cBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("I2cBus")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for I2cBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<T: SerialTransport> I2cBus<T> {
    pub fn new(name: impl Into<String>, device: DeviceClient<T>) -> Self {
        Self {
            name: name.into(),
            device,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying bridge client
    pub fn device(&self) -> &DeviceClient<T> {
        &self.device
    }

    /// Run one transaction against the slave at `addr`
    ///
    /// Writes `write` if present, then fills `read` if present.
    ///
    /// # Arguments
    ///
    /// * `addr` - 7-bit slave address
    /// * `write` - Bytes to write first
    /// * `read` - Buffer to fill, at most 255 bytes
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `addr` is not a 7-bit address (nothing is sent)
    /// - `read` is longer than 255 bytes (nothing is sent)
    /// - the bridge exchange fails
    /// - the slave does not acknowledge the read
    ///
    /// A write the slave does not acknowledge is not an error.
    pub async fn tx(&self, addr: u16, write: Option<&[u8]>, read: Option<&mut [u8]>) -> Result<()> {
        if addr >= MAX_ADDRESS {
            return Err(BridgeError::AddressOutOfRange(addr));
        }
        if let Some(buf) = read.as_deref() {
            if buf.len() > MAX_READ_LEN {
                return Err(BridgeError::ReadLengthOutOfRange(buf.len()));
            }
        }

        let addr = addr as u8;

        if let Some(data) = write {
            let acked = self.device.write_i2c(addr, data).await?;
            debug!(bus = %self.name, addr, acked, "Write phase done");

            if read.is_some() {
                tokio::time::sleep(WRITE_READ_GAP).await;
            }
        }

        if let Some(buf) = read {
            let data = self
                .device
                .read_i2c(addr, buf.len() as u8)
                .await?
                .ok_or(BridgeError::ReadFailed)?;

            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
        }

        Ok(())
    }

    /// Change the bus clock
    ///
    /// # Returns
    ///
    /// * `Result<u32>` - Frequency confirmed by the bridge, in Hz
    pub async fn set_speed(&self, freq_hz: u64) -> Result<u32> {
        let freq = u32::try_from(freq_hz).map_err(|_| BridgeError::InvalidSpeed(freq_hz))?;
        self.device.set_scl_frequency(freq).await
    }

    /// Close the bus and its transport
    pub async fn close(self) -> Result<()> {
        self.device.close().await
    }
}
