//! Trait abstraction for the bridge transport to enable testing

use tokio::io::{AsyncRead, AsyncWrite};

/// Byte-oriented duplex stream the bridge is reached through
///
/// Implemented for every `AsyncRead + AsyncWrite + Unpin + Send` type, so a
/// `tokio_serial::SerialStream` and in-memory test streams both qualify.
/// A read returning zero bytes means end of stream or timeout.
pub trait SerialTransport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> SerialTransport for T where T: AsyncRead + AsyncWrite + Unpin + Send {}
