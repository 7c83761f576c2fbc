//! # Serial Communication Module
//!
//! Handles the serial link to the RS232-I2C bridge.
//!
//! This module handles:
//! - Opening the serial port with the configured line settings
//! - Giving the bridge time to settle after the port opens
//! - Handing the port to a [`DeviceClient`](crate::device::DeviceClient)

pub mod port_trait;

pub use port_trait::SerialTransport;

use crate::config::{Parity, SerialConfig, StopBits};
use crate::device::DeviceClient;
use crate::error::{BridgeError, Result};
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Delay after opening the port before the bridge accepts commands
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

fn data_bits(bits: u8) -> Result<tokio_serial::DataBits> {
    match bits {
        5 => Ok(tokio_serial::DataBits::Five),
        6 => Ok(tokio_serial::DataBits::Six),
        7 => Ok(tokio_serial::DataBits::Seven),
        8 => Ok(tokio_serial::DataBits::Eight),
        other => Err(BridgeError::Serial(format!("Unsupported data bits: {}", other))),
    }
}

fn parity(parity: Parity) -> Result<tokio_serial::Parity> {
    match parity {
        Parity::None => Ok(tokio_serial::Parity::None),
        Parity::Even => Ok(tokio_serial::Parity::Even),
        Parity::Odd => Ok(tokio_serial::Parity::Odd),
        Parity::Mark | Parity::Space => Err(BridgeError::Serial(format!(
            "Parity {} is not supported by the serial backend",
            parity
        ))),
    }
}

fn stop_bits(stop_bits: StopBits) -> Result<tokio_serial::StopBits> {
    match stop_bits {
        StopBits::One => Ok(tokio_serial::StopBits::One),
        StopBits::Two => Ok(tokio_serial::StopBits::Two),
        StopBits::OnePointFive => Err(BridgeError::Serial(
            "1.5 stop bits are not supported by the serial backend".to_string(),
        )),
    }
}

/// Open the serial port described by `config`
///
/// # Arguments
///
/// * `config` - Port path and line settings
///
/// # Returns
///
/// * `Result<SerialStream>` - Opened serial port
///
/// # Errors
///
/// Returns error if the configuration is invalid, names line settings the
/// backend cannot express, or the port cannot be opened
///
/// # Examples
///
/// ```no_run
/// use rs232_i2c::config::SerialConfig;
/// use rs232_i2c::serial::open_port;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let port = open_port(&SerialConfig::default()).await?;
///     Ok(())
/// }
/// ```
pub async fn open_port(config: &SerialConfig) -> Result<tokio_serial::SerialStream> {
    config.validate()?;

    debug!(
        "Opening serial port {} at {} baud ({}{}{})",
        config.port, config.baud_rate, config.data_bits, config.parity, config.stop_bits
    );

    let port = tokio_serial::new(&config.port, config.baud_rate)
        .data_bits(data_bits(config.data_bits)?)
        .parity(parity(config.parity)?)
        .stop_bits(stop_bits(config.stop_bits)?)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", config.port, e)))?;

    tokio::time::sleep(SETTLE_DELAY).await;

    info!("Opened RS232-I2C bridge at {}", config.port);
    Ok(port)
}

/// Open the serial port and wrap it in a [`DeviceClient`] using the
/// configured read timeout
pub async fn open_device(config: &SerialConfig) -> Result<DeviceClient<tokio_serial::SerialStream>> {
    let port = open_port(config).await?;
    Ok(DeviceClient::with_read_timeout(port, config.read_timeout()))
}
