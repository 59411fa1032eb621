//! Serial transport for the MENSCH monitor
//!
//! This module provides:
//! - The `Channel` trait the monitor protocol is written against
//! - A serialport-backed connection (requires the `serial` feature)
//! - Port listing and auto-detection by device name pattern

pub mod channel;
#[cfg(test)]
pub mod mock;
pub mod port;

pub use channel::Channel;
pub use port::PortConfig;
#[cfg(feature = "serial")]
pub use port::SerialConnection;
