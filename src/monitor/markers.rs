//! Byte sequences the MENSCH monitor uses to frame its input

/// Ends the banner printed after a reset (never seen after a plain prompt)
pub const STARTUP_MARKER: &[u8] = b"\r\r>";

/// Text that must appear in the banner for the monitor to count as ready
pub const CONFIRMATION: &[u8] = b"MENSCH";

/// Prompt printed once a command has finished
pub const COMMAND_PROMPT: &[u8] = b"\r>";

/// Template printed when the monitor wants an address
pub const FIELD_READY: &[u8] = b"BB:AAAA";

/// Printed between the bank and offset parts of an address
pub const FIELD_SEPARATOR: &[u8] = b":";

/// Memory dump command
pub const DUMP_COMMAND: u8 = b'd';

/// Address fields the dump command asks for (low, high)
pub const DUMP_FIELDS: u8 = 2;

/// Whether `needle` occurs anywhere in `haystack`
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
