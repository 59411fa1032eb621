//! MENSCH monitor session
//!
//! Drives the monitor's line protocol as an explicit state machine:
//!
//! ```text
//! Unready --banner--> Ready --command--> AwaitingField(n)
//!    ^                  ^                     | (n fields framed by
//!    |                  |                     v  BB:AAAA and ':')
//!  desync             Idle <--finish-- Draining
//! ```
//!
//! The session owns its channel for its whole lifetime, so only one
//! command can ever be in flight against the board.

use crate::error::{DumpError, Result};
use crate::monitor::address::Address;
use crate::monitor::markers::{
    contains, CONFIRMATION, FIELD_READY, FIELD_SEPARATOR, STARTUP_MARKER,
};
use crate::serial::Channel;
use crate::signal::CancelToken;
use log::{debug, info, warn};
use std::fmt;

/// Banner bytes kept while waiting for the startup marker
const MAX_BANNER_LEN: usize = 4096;

/// Where the session is in the monitor's protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the post-reset banner
    Unready,
    /// Banner seen, no command issued yet
    Ready,
    /// Command sent, this many address fields still to supply
    AwaitingField(u8),
    /// All fields sent, the monitor is streaming its reply
    Draining,
    /// Reply drained, a new command may be issued
    Idle,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unready => write!(f, "unready"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::AwaitingField(n) => write!(f, "awaiting {} field(s)", n),
            SessionState::Draining => write!(f, "draining"),
            SessionState::Idle => write!(f, "idle"),
        }
    }
}

/// Protocol session over an exclusively owned channel
pub struct MonitorSession<C: Channel> {
    channel: C,
    state: SessionState,
}

impl<C: Channel> MonitorSession<C> {
    /// Start a session in the `Unready` state
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            state: SessionState::Unready,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// End the session and hand the channel back
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Block until the monitor prints its post-reset banner
    ///
    /// Stale input is discarded first. Reads continue until the startup
    /// marker arrives with the confirmation text somewhere in the same
    /// accumulated banner; a marker without it (a leftover prompt) starts
    /// the accumulation over. There is no attempt limit since progress
    /// depends on someone pressing reset, so the only way out other than
    /// success is `cancel`.
    pub fn wait_for_startup(&mut self, cancel: &CancelToken) -> Result<Vec<u8>> {
        self.channel.reset_buffers()?;
        self.state = SessionState::Unready;

        let mut banner = Vec::new();
        let mut reads = 0usize;

        loop {
            if cancel.is_cancelled() {
                info!("Startup detection cancelled after {} reads", reads);
                return Err(DumpError::Cancelled);
            }

            let chunk = self.channel.read_until(STARTUP_MARKER)?;
            reads += 1;
            if chunk.is_empty() {
                continue;
            }
            banner.extend_from_slice(&chunk);

            if banner.ends_with(STARTUP_MARKER) {
                if contains(&banner, CONFIRMATION) {
                    info!("Monitor ready after {} reads ({} banner bytes)", reads, banner.len());
                    self.state = SessionState::Ready;
                    return Ok(banner);
                }
                warn!(
                    "Ignoring {} bytes ending in the startup marker without {:?}",
                    banner.len(),
                    String::from_utf8_lossy(CONFIRMATION)
                );
                banner.clear();
            } else if banner.len() > MAX_BANNER_LEN {
                let excess = banner.len() - MAX_BANNER_LEN;
                banner.drain(..excess);
            }
        }
    }

    /// Read until `marker`, failing with a desync if it does not arrive
    pub fn expect(&mut self, marker: &[u8]) -> Result<Vec<u8>> {
        let received = self.channel.read_until(marker)?;

        if !received.ends_with(marker) {
            warn!(
                "Expected {:?}, got {:?} before timeout",
                String::from_utf8_lossy(marker),
                String::from_utf8_lossy(&received)
            );
            self.state = SessionState::Unready;
            return Err(DumpError::desync(marker, &received));
        }

        debug!("<- {:?}", String::from_utf8_lossy(&received));
        Ok(received)
    }

    /// Write `token`, treating a short write as fatal
    pub fn send(&mut self, token: &[u8]) -> Result<()> {
        match self.channel.write(token) {
            Ok(_) => {
                debug!("-> {:?}", String::from_utf8_lossy(token));
                Ok(())
            }
            Err(e) => {
                if e.needs_reset() {
                    self.state = SessionState::Unready;
                }
                Err(e)
            }
        }
    }

    /// Wait for `marker`, then send `token`
    pub fn exchange(&mut self, marker: &[u8], token: &[u8]) -> Result<Vec<u8>> {
        let received = self.expect(marker)?;
        self.send(token)?;
        Ok(received)
    }

    /// Issue a single-byte command that takes `fields` addresses
    pub fn begin_command(&mut self, command: u8, fields: u8) -> Result<()> {
        match self.state {
            SessionState::Ready | SessionState::Idle => {}
            other => return Err(self.not_ready(other)),
        }

        self.send(&[command])?;
        self.state = if fields == 0 {
            SessionState::Draining
        } else {
            SessionState::AwaitingField(fields)
        };
        debug!("Command {:?} sent, state {}", command as char, self.state);

        Ok(())
    }

    /// Supply the next address field of the current command
    pub fn supply_field(&mut self, address: &Address) -> Result<()> {
        let remaining = match self.state {
            SessionState::AwaitingField(n) if n > 0 => n,
            other => return Err(self.not_ready(other)),
        };

        let (bank, offset) = address.fields();
        self.exchange(FIELD_READY, bank.as_bytes())?;
        self.exchange(FIELD_SEPARATOR, offset.as_bytes())?;

        self.state = match remaining - 1 {
            0 => SessionState::Draining,
            n => SessionState::AwaitingField(n),
        };
        debug!("Address {} sent, state {}", address, self.state);

        Ok(())
    }

    /// Bytes of reply waiting to be read
    pub fn bytes_available(&mut self) -> Result<usize> {
        self.require_draining()?;
        self.channel.bytes_available()
    }

    /// Read up to `max` bytes of reply
    pub fn read_available(&mut self, max: usize) -> Result<Vec<u8>> {
        self.require_draining()?;
        self.channel.read_exact_or_timeout(max)
    }

    /// Mark the reply as fully drained
    pub fn finish(&mut self) -> Result<()> {
        self.require_draining()?;
        self.state = SessionState::Idle;
        Ok(())
    }

    fn require_draining(&self) -> Result<()> {
        match self.state {
            SessionState::Draining => Ok(()),
            other => Err(self.not_ready(other)),
        }
    }

    fn not_ready(&self, state: SessionState) -> DumpError {
        DumpError::NotReady {
            state: state.to_string(),
        }
    }
}
