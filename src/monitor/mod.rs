//! MENSCH monitor protocol
//!
//! This module provides:
//! - Address parsing in the monitor's `BB:AAAA` form
//! - The framing markers the monitor prints
//! - A session state machine for startup detection and command framing
//! - The memory dumper that drains a dump reply into a sink

pub mod address;
pub mod dumper;
pub mod markers;
pub mod session;

pub use address::{Address, AddressParseError, AddressRange};
pub use dumper::{DumpSettings, MemoryDumper};
pub use session::{MonitorSession, SessionState};
