//! # Frame Transport
//!
//! Writes request frames and reads response lines over a serial transport.
//!
//! Frame structure: `<BODY><CS><CR>` where `CS` is the checksum of `BODY` as
//! 2 uppercase hex digits and `CR` is a single carriage return.

use bytes::{BufMut, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use super::checksum::compute;
use crate::error::Result;
use crate::serial::SerialTransport;

/// Line terminator for requests and responses
pub const FRAME_TERMINATOR: u8 = b'\r';

/// Build the wire frame for a request body
///
/// # Examples
///
/// ```
/// use rs232_i2c::protocol::frame::encode_frame;
///
/// assert_eq!(encode_frame("C").unwrap(), "CBD\r");
/// ```
pub fn encode_frame(body: &str) -> Result<String> {
    let checksum = compute(body)?;
    Ok(format!("{}{:02X}\r", body, checksum))
}

/// Request/response line transport
pub struct FrameTransport<T> {
    port: T,
    /// Upper bound for each single-byte read, `None` waits forever
    read_timeout: Option<Duration>,
    /// Set once a request goes out, cleared when its response line is read
    awaiting_response: bool,
}

impl<T> std::fmt::Debug for FrameTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTransport")
            .field("read_timeout", &self.read_timeout)
            .field("awaiting_response", &self.awaiting_response)
            .finish_non_exhaustive()
    }
}

impl<T: SerialTransport> FrameTransport<T> {
    /// Wrap a transport without a read timeout
    pub fn new(port: T) -> Self {
        Self {
            port,
            read_timeout: None,
            awaiting_response: false,
        }
    }

    /// Wrap a transport, giving up on a read after `timeout`
    ///
    /// A read that times out is treated like a read returning zero bytes.
    pub fn with_read_timeout(port: T, timeout: Duration) -> Self {
        Self {
            port,
            read_timeout: Some(timeout),
            awaiting_response: false,
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Whether a request was sent whose response line was never read
    pub fn awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    /// Send a request frame for `body`
    ///
    /// If an earlier exchange was abandoned before its response line was
    /// read, the leftover line is discarded first so it cannot be taken as
    /// the response to this request.
    ///
    /// # Errors
    ///
    /// Returns `NonAsciiInput` before writing anything if the body is not
    /// ASCII, and `Io` if the transport fails.
    pub async fn write_request(&mut self, body: &str) -> Result<()> {
        let frame = encode_frame(body)?;

        if self.awaiting_response {
            self.discard_pending_line().await?;
        }

        debug!(frame = frame.trim_end(), "Write request");

        self.awaiting_response = true;
        self.port.write_all(frame.as_bytes()).await?;
        self.port.flush().await?;

        Ok(())
    }

    /// Read one response line
    ///
    /// Reads byte by byte until a carriage return or a zero-byte read
    /// (timeout or end of stream). The terminator is not included.
    pub async fn read_response_line(&mut self) -> Result<String> {
        let line = self.read_line_bytes().await?;
        self.awaiting_response = false;

        let line = String::from_utf8_lossy(&line).into_owned();
        debug!(line = %line, "Read response");

        Ok(line)
    }

    async fn discard_pending_line(&mut self) -> Result<()> {
        let stale = self.read_line_bytes().await?;
        self.awaiting_response = false;

        warn!(
            line = %String::from_utf8_lossy(&stale),
            "Discarded response of an abandoned exchange"
        );
        Ok(())
    }

    async fn read_line_bytes(&mut self) -> Result<BytesMut> {
        let mut line = BytesMut::with_capacity(64);
        let mut byte = [0u8; 1];

        loop {
            let n = self.read_byte(&mut byte).await?;
            if n == 0 || byte[0] == FRAME_TERMINATOR {
                break;
            }
            line.put_u8(byte[0]);
        }

        Ok(line)
    }

    async fn read_byte(&mut self, byte: &mut [u8; 1]) -> Result<usize> {
        let Some(timeout) = self.read_timeout else {
            return Ok(self.port.read(byte).await?);
        };

        match tokio::time::timeout(timeout, self.port.read(byte)).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                debug!("Read timed out after {:?}", timeout);
                Ok(0)
            }
        }
    }

    /// Shut down the write half of the transport
    pub async fn shutdown(&mut self) -> Result<()> {
        self.port.shutdown().await?;
        Ok(())
    }

    pub fn into_inner(self) -> T {
        self.port
    }
}
