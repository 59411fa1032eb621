//! Hex dump text to binary conversion
//!
//! A captured dump is whatever the monitor printed: the echoed command,
//! prompts, and data lines of the form
//!
//! ```text
//! 00:<hex digits> <ascii rendering>
//! ```
//!
//! Only lines starting with `00:` carry data. The hex column is normally one
//! packed token (`00:A9008D00 ....`), and everything after it is the ASCII
//! column, even when that happens to look like hex. Rows printed as
//! space-separated pairs (`00:A9 00 8D 00 ....`) run until the first token
//! that is not exactly two hex digits. Lines end in `\r` (as the monitor
//! sends them) or `\n`.

use super::BinaryImage;
use crate::error::{DumpError, Result};
use std::io::Read;

/// Prefix marking a data line
pub const DATA_LINE_PREFIX: &str = "00:";

/// Parse captured dump text into an image
///
/// Non-data lines are skipped. A data line with an odd number of hex
/// digits, or whose hex column holds anything but hex digits, fails the
/// whole conversion: skipping it would shift every later byte.
pub fn parse(input: &str) -> Result<BinaryImage> {
    let mut image = BinaryImage::new();

    let lines = input
        .split(|c: char| c == '\r' || c == '\n')
        .filter(|line| !line.is_empty());

    for (index, line) in lines.enumerate() {
        if let Some(body) = line.strip_prefix(DATA_LINE_PREFIX) {
            let bytes = decode_line(body).ok_or_else(|| DumpError::MalformedHexLine {
                line_number: index + 1,
                line: line.to_string(),
            })?;
            image.extend_from_slice(&bytes);
        }
    }

    log::debug!("Parsed {} bytes", image.len());
    Ok(image)
}

/// Parse a captured dump from a reader
///
/// The capture is raw serial data, so bytes that are not valid UTF-8 are
/// replaced rather than rejected; they can only occur outside data lines
/// in a well-formed dump.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<BinaryImage> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    parse(&String::from_utf8_lossy(&raw))
}

fn decode_line(body: &str) -> Option<Vec<u8>> {
    let mut tokens = body.split_whitespace();
    let first = match tokens.next() {
        Some(token) => token,
        None => return Some(Vec::new()),
    };
    if !is_hex(first) {
        return None;
    }

    let mut digits = String::from(first);
    // Space-separated rows continue pair by pair; a packed row is one token
    if first.len() == 2 {
        for token in tokens.take_while(|t| t.len() == 2 && is_hex(t)) {
            digits.push_str(token);
        }
    }

    hex::decode(&digits).ok()
}

fn is_hex(token: &str) -> bool {
    token.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let image = parse("00:DEADBEEF ....").unwrap();
        assert_eq!(image.as_bytes(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_odd_length_rejected() {
        let err = parse("00:ABC ....").unwrap_err();
        match err {
            DumpError::MalformedHexLine { line_number, line } => {
                assert_eq!(line_number, 1);
                assert_eq!(line, "00:ABC ....");
            }
            other => panic!("expected MalformedHexLine, got {:?}", other),
        }
    }

    #[test]
    fn test_non_hex_rejected() {
        assert!(matches!(
            parse("00:DEXG ...."),
            Err(DumpError::MalformedHexLine { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_lines_keep_order() {
        let image = parse("00:0102\n00:0304").unwrap();
        assert_eq!(image.as_bytes(), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_noise_lines_ignored() {
        let text = "d\rBB:AAAA00:0200\rW65C265 MENSCH\r01:FFFF 00\r\r>";
        let image = parse(text).unwrap();
        assert!(image.is_empty());

        let mut text = String::from("banner\r");
        text.push_str("00:0102 ..\r");
        text.push_str("not hex at all: zz\r");
        text.push_str("00:0304 ..\r");
        assert_eq!(parse(&text).unwrap().as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_space_separated_pairs() {
        let image = parse("00:41 42 43 44 ABCD\r\n00:0a 0B  ..\r\n").unwrap();
        assert_eq!(image.as_bytes(), &[0x41, 0x42, 0x43, 0x44, 0x0A, 0x0B]);
    }

    #[test]
    fn test_hex_looking_ascii_column_ignored() {
        let image = parse("00:30313233 0123").unwrap();
        assert_eq!(image.as_bytes(), &[0x30, 0x31, 0x32, 0x33]);

        let image = parse("00:414243 ABC").unwrap();
        assert_eq!(image.as_bytes(), &[0x41, 0x42, 0x43]);

        let image = parse("00:4142 AB\r00:4344 CD").unwrap();
        assert_eq!(image.as_bytes(), &[0x41, 0x42, 0x43, 0x44]);
    }

    #[test]
    fn test_line_numbers_count_non_empty_lines() {
        let err = parse("banner\r\n00:0102\r\n00:123\r\n").unwrap_err();
        assert!(matches!(
            err,
            DumpError::MalformedHexLine { line_number: 3, .. }
        ));
    }

    #[test]
    fn test_prefix_only_line() {
        assert!(parse("00:\r00:   \r").unwrap().is_empty());
    }

    #[test]
    fn test_parse_is_repeatable() {
        let text = "00:00FF10 ...\r00:7E7F ~.\r";
        assert_eq!(parse(text).unwrap(), parse(text).unwrap());
    }

    #[test]
    fn test_even_lines_never_fail() {
        let mut text = String::new();
        for len in 0..32usize {
            text.push_str("00:");
            for i in 0..len {
                text.push_str(&format!("{:02x}", (i * 37) as u8));
            }
            if len > 0 {
                text.push_str(" 0123");
            }
            text.push('\r');
        }
        let image = parse(&text).unwrap();
        assert_eq!(image.len(), (0..32).sum::<usize>());
    }

    #[test]
    fn test_parse_reader_tolerates_binary_noise() {
        let mut raw = vec![0xFF, 0xFE, b'\r'];
        raw.extend_from_slice(b"00:CAFE ..\r");
        let image = parse_reader(raw.as_slice()).unwrap();
        assert_eq!(image.as_bytes(), &[0xCA, 0xFE]);
    }
}
