//! Byte-level channel abstraction
//!
//! The monitor protocol only needs a handful of primitives from the
//! transport. Keeping them behind a trait lets the session and dumper run
//! against a real serial port or a scripted channel in tests.

use crate::error::Result;

/// Byte transport to the monitor
///
/// Timeouts are not errors for reads: a silent monitor is a normal state
/// while the operator is pressing reset, so reads hand back whatever they
/// collected and callers compare it against what they expected.
pub trait Channel {
    /// Write all of `bytes`, failing with `WriteTimeout` on a short write
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Read up to `n` bytes, returning early with partial data on timeout
    fn read_exact_or_timeout(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Read until `marker` is a suffix of the data read, or the timeout elapses
    fn read_until(&mut self, marker: &[u8]) -> Result<Vec<u8>>;

    /// Number of received bytes waiting to be read (non-blocking)
    fn bytes_available(&mut self) -> Result<usize>;

    /// Discard anything queued in either direction
    fn reset_buffers(&mut self) -> Result<()>;
}
