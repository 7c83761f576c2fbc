//! # RS232-I2C
//!
//! Command line front end for the Coptonix RS232-I2C bridge.
//!
//! Each invocation opens the serial port, runs one bridge command, prints the
//! result and closes the port again.
//!
//! # Examples
//!
//! ```bash
//! rs232-i2c --serial-port /dev/ttyUSB0 scan-i2c
//! rs232-i2c --serial-port /dev/ttyUSB0 read-i2c 0x50 4
//! rs232-i2c --serial-port /dev/ttyUSB0 write-i2c 0x50 00A1FF
//! ```
//!
//! Expected output:
//! ```text
//! 0x50 0x68
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use rs232_i2c::config::{Config, Parity, SerialConfig, StopBits};
use rs232_i2c::device::DeviceClient;
use rs232_i2c::serial::{open_device, SerialTransport};

/// Coptonix RS232-I2C command line tool
#[derive(Parser, Debug)]
#[command(name = "rs232-i2c", version, about, long_about = None)]
struct Args {
    /// Serial port the bridge is attached to (overrides the config file)
    #[arg(long, env = "SERIAL_PORT", required_unless_present = "config")]
    serial_port: Option<String>,

    /// Baud rate
    #[arg(long, env = "BAUD_RATE", default_value_t = 19200)]
    baud_rate: u32,

    /// Data bits (5-8)
    #[arg(long, env = "DATA_BITS", default_value_t = 8)]
    data_bits: u8,

    /// Parity: N, E, O, M or S
    #[arg(long, env = "PARITY", default_value = "N")]
    parity: Parity,

    /// Stop bits: 1, 1.5 or 2
    #[arg(long, env = "STOP_BITS", default_value = "1")]
    stop_bits: StopBits,

    /// Read timeout in milliseconds
    #[arg(long, env = "READ_TIMEOUT_MS", default_value_t = 5000)]
    read_timeout_ms: u64,

    /// Load line settings from a TOML file instead of the flags above
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Cmd {
    /// List the addresses of all slaves on the bus
    ScanI2c,

    /// Check whether a slave acknowledges its address
    CheckSlaveAddr {
        #[arg(value_parser = parse_u8)]
        slave_address: u8,
    },

    /// Read bytes from a slave
    ReadI2c {
        #[arg(value_parser = parse_u8)]
        slave_address: u8,
        #[arg(value_parser = parse_u8)]
        count: u8,
    },

    /// Write hex-encoded bytes to a slave
    WriteI2c {
        #[arg(value_parser = parse_u8)]
        slave_address: u8,
        #[arg(value_parser = parse_hex)]
        data: HexBytes,
    },

    /// Print the SCL clock frequency in Hz
    GetSclFrequency,

    /// Set the SCL clock frequency in Hz
    SetSclFrequency {
        #[arg(value_parser = parse_u32)]
        frequency: u32,
    },
}

/// Result of one bridge command
#[derive(Debug, PartialEq)]
enum Output {
    Bytes(Vec<u8>),
    Flag(bool),
    Frequency(u32),
}

impl Output {
    fn to_text(&self) -> String {
        match self {
            Output::Bytes(bytes) => bytes
                .iter()
                .map(|b| format!("0x{:02x} ", b))
                .collect(),
            Output::Flag(flag) => flag.to_string(),
            Output::Frequency(freq) => freq.to_string(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Output::Bytes(bytes) => serde_json::json!(bytes),
            Output::Flag(flag) => serde_json::json!(flag),
            Output::Frequency(freq) => serde_json::json!(freq),
        }
    }
}

/// Payload given as a hex string on the command line
#[derive(Debug, Clone, PartialEq)]
struct HexBytes(Vec<u8>);

fn parse_hex(s: &str) -> std::result::Result<HexBytes, String> {
    hex::decode(s)
        .map(HexBytes)
        .map_err(|e| format!("invalid hex data '{}': {}", s, e))
}

fn parse_u64(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn parse_u8(s: &str) -> std::result::Result<u8, String> {
    u8::try_from(parse_u64(s)?).map_err(|_| format!("'{}' does not fit in 8 bits", s))
}

fn parse_u32(s: &str) -> std::result::Result<u32, String> {
    u32::try_from(parse_u64(s)?).map_err(|_| format!("'{}' does not fit in 32 bits", s))
}

impl Args {
    /// Serial settings from `--config` or from the individual flags
    fn serial_config(&self) -> Result<SerialConfig> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?
                .serial,
            None => SerialConfig {
                port: String::new(),
                baud_rate: self.baud_rate,
                data_bits: self.data_bits,
                parity: self.parity,
                stop_bits: self.stop_bits,
                read_timeout_ms: self.read_timeout_ms,
            },
        };

        if let Some(port) = &self.serial_port {
            config.port = port.clone();
        }
        config.validate()?;

        Ok(config)
    }
}

async fn run<T: SerialTransport>(device: &DeviceClient<T>, command: &Cmd) -> Result<Output> {
    let output = match command {
        Cmd::ScanI2c => Output::Bytes(device.scan_i2c().await?),
        Cmd::CheckSlaveAddr { slave_address } => {
            Output::Flag(device.check_slave_address(*slave_address).await?)
        }
        Cmd::ReadI2c { slave_address, count } => {
            match device.read_i2c(*slave_address, *count).await? {
                Some(data) => Output::Bytes(data),
                None => Output::Flag(false),
            }
        }
        Cmd::WriteI2c { slave_address, data } => {
            Output::Flag(device.write_i2c(*slave_address, &data.0).await?)
        }
        Cmd::GetSclFrequency => Output::Frequency(device.get_scl_frequency().await?),
        Cmd::SetSclFrequency { frequency } => {
            Output::Frequency(device.set_scl_frequency(*frequency).await?)
        }
    };

    Ok(output)
}

/// Main entry point for the RS232-I2C command line tool
///
/// # Errors
///
/// Returns error if:
/// - Arguments or configuration are invalid
/// - Serial port cannot be opened
/// - The bridge command fails
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.into())
        )
        .with_writer(std::io::stderr)
        .init();

    debug!("RS232-I2C v{} starting", env!("CARGO_PKG_VERSION"));

    let config = args.serial_config()?;
    let device = open_device(&config).await?;
    info!("Bridge ready on {}", config.port);

    let result = run(&device, &args.command).await;
    device.close().await?;
    let output = result?;

    if args.json {
        println!("{}", output.to_json());
    } else {
        println!("{}", output.to_text());
    }

    Ok(())
}
