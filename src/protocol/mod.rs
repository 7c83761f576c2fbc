//! # Bridge Protocol Module
//!
//! Implementation of the ASCII line protocol spoken by the RS232-I2C bridge.
//!
//! This module handles:
//! - Additive checksum calculation and verification
//! - Request framing and response line reading
//! - Command letters and request bodies
//! - Response decoding, device error sentinels and per-command layouts

pub mod checksum;
pub mod command;
pub mod frame;
pub mod response;
