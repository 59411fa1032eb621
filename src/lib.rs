//! Memory dumps from the W65C265 MENSCH monitor ROM
//!
//! The monitor is driven over a serial link: wait for the board to reset
//! and print its banner, send the `d` command with a low and high address,
//! then capture everything it prints until the line goes quiet. The capture
//! can then be converted into a raw binary image.
//!
//! # Modules
//!
//! - [`serial`]: the `Channel` transport trait and the serialport-backed
//!   connection (requires the `serial` feature)
//! - [`monitor`]: addresses, markers, the session state machine and the
//!   memory dumper
//! - [`image`]: hex dump parsing and binary images
//! - [`config`]: TOML tool configuration
//! - [`signal`]: Ctrl+C cancellation for blocking waits

pub mod config;
pub mod error;
pub mod image;
pub mod monitor;
pub mod serial;
pub mod signal;

pub use error::{DumpError, Result};
