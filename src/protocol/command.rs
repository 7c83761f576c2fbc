//! # Bridge Command Set
//!
//! Command letters and request body builders.
//!
//! A request body is the command letter followed by uppercase hex fields,
//! without separators. The checksum and terminator are added by the frame
//! layer.

/// Operations understood by the bridge firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Read bytes from a slave (`R`)
    ReadI2c,
    /// Write bytes to a slave (`w`)
    WriteI2c,
    /// Check whether a slave acknowledges its address (`c`)
    CheckSlaveAddress,
    /// List all acknowledging slaves (`C`)
    ScanI2c,
    /// Query the SCL clock frequency (`I`)
    GetSclFrequency,
    /// Change the SCL clock frequency (`E`)
    SetSclFrequency,
}

impl Command {
    /// Command letter, case significant
    pub fn letter(self) -> char {
        match self {
            Command::ReadI2c => 'R',
            Command::WriteI2c => 'w',
            Command::CheckSlaveAddress => 'c',
            Command::ScanI2c => 'C',
            Command::GetSclFrequency => 'I',
            Command::SetSclFrequency => 'E',
        }
    }

    /// Byte value echoed as the first byte of a successful response
    pub fn byte(self) -> u8 {
        self.letter() as u8
    }
}

/// `R` + address + count
pub fn read_i2c(addr: u8, count: u8) -> String {
    format!("{}{:02X}{:02X}", Command::ReadI2c.letter(), addr, count)
}

/// `w` + address + payload
pub fn write_i2c(addr: u8, data: &[u8]) -> String {
    format!("{}{:02X}{}", Command::WriteI2c.letter(), addr, hex::encode_upper(data))
}

/// `c` + address
pub fn check_slave_address(addr: u8) -> String {
    format!("{}{:02X}", Command::CheckSlaveAddress.letter(), addr)
}

/// `C`
pub fn scan_i2c() -> String {
    Command::ScanI2c.letter().to_string()
}

/// `I`
pub fn get_scl_frequency() -> String {
    Command::GetSclFrequency.letter().to_string()
}

/// `E` + frequency as 4 little-endian bytes
pub fn set_scl_frequency(freq: u32) -> String {
    format!(
        "{}{}",
        Command::SetSclFrequency.letter(),
        hex::encode_upper(freq.to_le_bytes())
    )
}
