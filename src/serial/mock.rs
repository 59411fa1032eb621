//! Scripted channel for testing the monitor protocol without a board
//!
//! Bytes reach the reader from four places:
//! - `inbound`: already queued (and discarded by `reset_buffers`)
//! - `replies`: one entry released after each write
//! - `bursts`: one entry released whenever a poll finds nothing queued,
//!   optionally only after the line has been quiet for a while
//! - `idle_reply`: repeated forever once everything else has run out

use crate::error::{DumpError, Result};
use crate::serial::Channel;
use crate::signal::CancelToken;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A simulated monitor connection
#[derive(Default)]
pub struct MockChannel {
    inbound: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    bursts: VecDeque<(Duration, Vec<u8>)>,
    last_data: Option<Instant>,
    idle_reply: Option<Vec<u8>>,
    write_limit: Option<usize>,
    cancel_after: Option<(usize, CancelToken)>,
    /// Every write, in order
    pub writes: Vec<Vec<u8>>,
    /// Number of `read_until` calls made
    pub read_until_calls: usize,
    /// Number of `reset_buffers` calls made
    pub resets: usize,
}

impl MockChannel {
    /// Create an empty channel that never produces data
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes that are already waiting when the session starts
    pub fn with_inbound(mut self, bytes: &[u8]) -> Self {
        self.inbound.extend(bytes.iter().copied());
        self
    }

    /// Queue a reply released by the next unanswered write
    pub fn with_reply(mut self, bytes: &[u8]) -> Self {
        self.replies.push_back(bytes.to_vec());
        self
    }

    /// Queue a burst released by a poll that finds nothing waiting
    pub fn with_burst(self, bytes: &[u8]) -> Self {
        self.with_burst_after(Duration::ZERO, bytes)
    }

    /// Queue a burst held back until nothing has been read for `quiet`
    pub fn with_burst_after(mut self, quiet: Duration, bytes: &[u8]) -> Self {
        self.bursts.push_back((quiet, bytes.to_vec()));
        self
    }

    /// Reply returned by every `read_until` once the script runs out
    pub fn with_idle_reply(mut self, bytes: &[u8]) -> Self {
        self.idle_reply = Some(bytes.to_vec());
        self
    }

    /// Accept at most `limit` bytes per write
    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    /// Cancel `token` once `read_until` has been called `polls` times
    pub fn cancel_after(mut self, polls: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((polls, token));
        self
    }

    /// All written bytes concatenated
    pub fn written(&self) -> Vec<u8> {
        self.writes.concat()
    }

    fn refill(&mut self, allow_idle: bool) {
        if !self.inbound.is_empty() {
            return;
        }
        if let Some((quiet, _)) = self.bursts.front() {
            let elapsed = self.last_data.map_or(Duration::MAX, |t| t.elapsed());
            if elapsed >= *quiet {
                if let Some((_, burst)) = self.bursts.pop_front() {
                    self.inbound.extend(burst);
                }
            }
        } else if allow_idle {
            if let Some(ref idle) = self.idle_reply {
                self.inbound.extend(idle.iter().copied());
            }
        }
    }
}

impl Channel for MockChannel {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if let Some(limit) = self.write_limit {
            if bytes.len() > limit {
                self.writes.push(bytes[..limit].to_vec());
                return Err(DumpError::WriteTimeout {
                    written: limit,
                    expected: bytes.len(),
                });
            }
        }

        self.writes.push(bytes.to_vec());
        if let Some(reply) = self.replies.pop_front() {
            self.inbound.extend(reply);
        }
        Ok(bytes.len())
    }

    fn read_exact_or_timeout(&mut self, n: usize) -> Result<Vec<u8>> {
        self.refill(false);
        let count = n.min(self.inbound.len());
        if count > 0 {
            self.last_data = Some(Instant::now());
        }
        Ok(self.inbound.drain(..count).collect())
    }

    fn read_until(&mut self, marker: &[u8]) -> Result<Vec<u8>> {
        self.read_until_calls += 1;
        if let Some((polls, ref token)) = self.cancel_after {
            if self.read_until_calls >= polls {
                token.cancel();
            }
        }

        self.refill(true);
        let mut buffer = Vec::new();
        while !buffer.ends_with(marker) {
            match self.inbound.pop_front() {
                Some(byte) => buffer.push(byte),
                None => break,
            }
        }
        Ok(buffer)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        self.refill(false);
        Ok(self.inbound.len())
    }

    fn reset_buffers(&mut self) -> Result<()> {
        self.resets += 1;
        self.inbound.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_until_stops_after_marker() {
        let mut channel = MockChannel::new().with_inbound(b"abc:def");
        assert_eq!(channel.read_until(b":").unwrap(), b"abc:");
        assert_eq!(channel.bytes_available().unwrap(), 3);
    }

    #[test]
    fn test_replies_follow_writes() {
        let mut channel = MockChannel::new().with_reply(b"one").with_reply(b"two");
        assert_eq!(channel.bytes_available().unwrap(), 0);

        channel.write(b"x").unwrap();
        assert_eq!(channel.read_exact_or_timeout(10).unwrap(), b"one");

        channel.write(b"y").unwrap();
        assert_eq!(channel.read_exact_or_timeout(2).unwrap(), b"tw");
        assert_eq!(channel.written(), b"xy");
    }

    #[test]
    fn test_burst_waits_for_quiet_line() {
        let mut channel = MockChannel::new()
            .with_inbound(b"ab")
            .with_burst_after(Duration::from_millis(30), b"cd");

        assert_eq!(channel.read_exact_or_timeout(2).unwrap(), b"ab");
        assert_eq!(channel.bytes_available().unwrap(), 0);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(channel.bytes_available().unwrap(), 2);
    }

    #[test]
    fn test_short_write_is_reported() {
        let mut channel = MockChannel::new().with_write_limit(2);
        let err = channel.write(b"E000").unwrap_err();
        assert!(matches!(
            err,
            DumpError::WriteTimeout {
                written: 2,
                expected: 4
            }
        ));
    }
}
