//! Binary images rebuilt from captured monitor dumps
//!
//! Provides the image type and the hex dump parser that produces it.

pub mod parser;

pub use parser::{parse, parse_reader, DATA_LINE_PREFIX};

use crc::{Crc, CRC_32_ISO_HDLC};
use std::fs;
use std::io;
use std::path::Path;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Bytes decoded from a dump, in the order the monitor printed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryImage {
    bytes: Vec<u8>,
}

impl BinaryImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// CRC-32 (ISO-HDLC, as used by zip and Ethernet) of the image
    pub fn checksum(&self) -> u32 {
        CRC32.checksum(&self.bytes)
    }

    /// Write the raw image to `path`, replacing any existing file
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.bytes)
    }
}

/// Convert a capture file into a binary image file
///
/// The output is only written once the whole capture has parsed.
pub fn convert_file(capture: &Path, output: &Path) -> crate::error::Result<BinaryImage> {
    let file = fs::File::open(capture)?;
    let image = parse_reader(io::BufReader::new(file))?;
    image.write_to(output)?;
    log::info!(
        "Converted {} into {} ({} bytes)",
        capture.display(),
        output.display(),
        image.len()
    );
    Ok(image)
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
