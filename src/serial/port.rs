//! Serial port configuration and connection management
//!
//! Handles USB serial port discovery and the serialport-backed `Channel`
//! used to talk to the MENSCH monitor.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

#[cfg(feature = "serial")]
use crate::error::{DumpError, Result};
#[cfg(feature = "serial")]
use crate::serial::Channel;
#[cfg(feature = "serial")]
use serialport::SerialPort;
#[cfg(feature = "serial")]
use std::io::{self, Read, Write};
#[cfg(feature = "serial")]
use std::time::Instant;

/// Default baud rate of the MENSCH monitor
pub const DEFAULT_BAUD: u32 = 9600;

/// Default read/write timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Port names of common USB-to-serial adapters (macOS and Linux)
pub const DEFAULT_DEVICE_PATTERN: &str = r"usbserial-\w{2,}|ttyUSB\d+";

static DEFAULT_DEVICE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_DEVICE_PATTERN).expect("default device pattern is valid"));

/// Compiled default device pattern
pub fn default_device_pattern() -> &'static Regex {
    &DEFAULT_DEVICE_REGEX
}

/// Return the first port name matching `pattern`
pub fn first_match<'a, I>(names: I, pattern: &Regex) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().find(|name| pattern.is_match(name))
}

/// Configuration for serial port connection
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Serial port path (e.g., /dev/ttyUSB0, /dev/cu.usbserial-A10LVXS7)
    pub port_path: String,
    /// Baud rate (default: 9600)
    pub baud_rate: u32,
    /// Timeout applied to both reads and writes
    pub timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_path: String::from("/dev/ttyUSB0"),
            baud_rate: DEFAULT_BAUD,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PortConfig {
    /// Create a new configuration with default monitor settings
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            ..Default::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read/write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Serial connection to the monitor
#[cfg(feature = "serial")]
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    config: PortConfig,
}

#[cfg(feature = "serial")]
impl SerialConnection {
    /// Open a serial connection with the given configuration
    pub fn open(config: PortConfig) -> Result<Self> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(|e| DumpError::Connection {
                port: config.port_path.clone(),
                reason: e.to_string(),
            })?;

        log::info!(
            "Opened {} at {} baud (timeout {:?})",
            config.port_path,
            config.baud_rate,
            config.timeout
        );

        Ok(Self { port, config })
    }

    /// Read a single byte, giving up at `deadline`
    fn read_byte_before(&mut self, deadline: Instant) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.port.set_timeout(remaining).map_err(io::Error::from)?;

            match self.port.read(&mut byte) {
                Ok(1) => return Ok(Some(byte[0])),
                Ok(_) => continue,
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Put the configured timeout back after a deadline-bounded read
    fn restore_timeout(&mut self) -> Result<()> {
        self.port
            .set_timeout(self.config.timeout)
            .map_err(io::Error::from)?;
        Ok(())
    }
}

#[cfg(feature = "serial")]
impl Channel for SerialConnection {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut written = 0;

        while written < bytes.len() {
            match self.port.write(&bytes[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if written < bytes.len() {
            return Err(DumpError::WriteTimeout {
                written,
                expected: bytes.len(),
            });
        }

        match self.port.flush() {
            Ok(()) => Ok(written),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Err(DumpError::WriteTimeout {
                written,
                expected: bytes.len(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn read_exact_or_timeout(&mut self, n: usize) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.config.timeout;
        let mut buffer = Vec::with_capacity(n);

        while buffer.len() < n {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.port.set_timeout(remaining).map_err(io::Error::from)?;

            let mut chunk = vec![0u8; n - buffer.len()];
            match self.port.read(&mut chunk) {
                Ok(count) => buffer.extend_from_slice(&chunk[..count]),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        self.restore_timeout()?;
        Ok(buffer)
    }

    fn read_until(&mut self, marker: &[u8]) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.config.timeout;
        let mut buffer = Vec::new();

        // Byte at a time so nothing past the marker is consumed
        while !buffer.ends_with(marker) {
            match self.read_byte_before(deadline)? {
                Some(byte) => buffer.push(byte),
                None => break,
            }
        }

        self.restore_timeout()?;
        Ok(buffer)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let count = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(count as usize)
    }

    fn reset_buffers(&mut self) -> Result<()> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(io::Error::from)?;
        Ok(())
    }
}

/// Information about a detected serial port
#[cfg(feature = "serial")]
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub path: String,
    pub product: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

/// List all available serial ports
#[cfg(feature = "serial")]
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(io::Error::from)?;

    Ok(ports
        .into_iter()
        .map(|p| match p.port_type {
            serialport::SerialPortType::UsbPort(info) => PortInfo {
                path: p.port_name,
                product: info.product,
                vid: Some(info.vid),
                pid: Some(info.pid),
            },
            _ => PortInfo {
                path: p.port_name,
                product: None,
                vid: None,
                pid: None,
            },
        })
        .collect())
}

/// Get the first available device whose name matches `pattern`
#[cfg(feature = "serial")]
pub fn find_device(pattern: &Regex) -> Result<Option<String>> {
    let ports = list_ports()?;
    let found = first_match(ports.iter().map(|p| p.path.as_str()), pattern).map(str::to_string);

    match &found {
        Some(path) => log::debug!("Pattern {} matched {}", pattern, path),
        None => log::debug!("Pattern {} matched none of {} ports", pattern, ports.len()),
    }

    Ok(found)
}
