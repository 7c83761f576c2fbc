//! # RS232-I2C Library
//!
//! Drive an I2C bus through a Coptonix RS232-I2C serial bridge.
//!
//! This library provides the line protocol, a client for the bridge's command
//! set, and a generic I2C bus adapter on top of it.

pub mod bus;
pub mod config;
pub mod device;
pub mod error;
pub mod protocol;
pub mod serial;
