//! Monitor addresses
//!
//! The monitor asks for an address as `BB:AAAA`: a bank byte and a 16-bit
//! offset, each typed as hex digits. Both parts are sent as separate writes.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned for address text not in `BB:AAAA` form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid address {input:?}: expected BB:AAAA (2 + 4 hex digits)")]
pub struct AddressParseError {
    pub input: String,
}

/// A bank/offset address as typed into the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub bank: u8,
    pub offset: u16,
}

impl Address {
    pub const fn new(bank: u8, offset: u16) -> Self {
        Self { bank, offset }
    }

    /// 24-bit linear value, used for ordering
    pub fn linear(&self) -> u32 {
        (u32::from(self.bank) << 16) | u32::from(self.offset)
    }

    /// The two fragments written to the monitor: bank, then offset
    pub fn fields(&self) -> (String, String) {
        (
            format!("{:02X}", self.bank),
            format!("{:04X}", self.offset),
        )
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:04X}", self.bank, self.offset)
    }
}

fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressParseError {
            input: s.to_string(),
        };

        let (bank, offset) = s.split_once(':').ok_or_else(invalid)?;
        if !is_hex_of_len(bank, 2) || !is_hex_of_len(offset, 4) {
            return Err(invalid());
        }

        Ok(Self {
            bank: u8::from_str_radix(bank, 16).map_err(|_| invalid())?,
            offset: u16::from_str_radix(offset, 16).map_err(|_| invalid())?,
        })
    }
}

/// Inclusive range of addresses to dump
///
/// `low <= high` is up to the caller; the monitor is sent whatever is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    pub low: Address,
    pub high: Address,
}

impl AddressRange {
    pub fn new(low: Address, high: Address) -> Self {
        Self { low, high }
    }

    pub fn is_ordered(&self) -> bool {
        self.low.linear() <= self.high.linear()
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}
