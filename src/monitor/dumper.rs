//! Memory dump orchestration
//!
//! Sends the `d` command with a low and high address, then drains the
//! monitor's reply into a sink. The monitor has no end-of-dump marker, so
//! the reply is considered complete once the line has been quiet for the
//! settle delay.

use crate::error::Result;
use crate::monitor::address::AddressRange;
use crate::monitor::markers::{COMMAND_PROMPT, DUMP_COMMAND, DUMP_FIELDS};
use crate::monitor::session::MonitorSession;
use crate::serial::Channel;
use log::{debug, info, warn};
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

/// Default quiet period that ends a dump
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Default sleep between polls while draining
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default largest single read while draining
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Tunables for draining the monitor's reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSettings {
    /// Quiet period after which the dump is considered finished
    pub settle_delay: Duration,
    /// Sleep between polls, giving the monitor time to send more
    pub poll_interval: Duration,
    /// Largest single read
    pub chunk_size: usize,
}

impl Default for DumpSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Runs one dump command per call against a ready session
#[derive(Debug, Clone, Default)]
pub struct MemoryDumper {
    settings: DumpSettings,
}

impl MemoryDumper {
    pub fn new(settings: DumpSettings) -> Self {
        Self { settings }
    }

    /// Dump `range` and append the monitor's reply to `sink`
    ///
    /// Returns the number of bytes written. Bytes reach the sink in the
    /// order they were received.
    pub fn dump<C, W>(
        &self,
        session: &mut MonitorSession<C>,
        range: &AddressRange,
        sink: &mut W,
    ) -> Result<usize>
    where
        C: Channel,
        W: Write,
    {
        info!("Requesting dump of {}", range);

        session.begin_command(DUMP_COMMAND, DUMP_FIELDS)?;
        session.supply_field(&range.low)?;
        session.supply_field(&range.high)?;

        let (total, at_prompt) = self.drain(session, sink)?;
        session.finish()?;

        if total > 0 && !at_prompt {
            warn!("Reply went quiet without returning to the command prompt");
        }

        info!("Dump of {} complete: {} bytes", range, total);
        Ok(total)
    }

    /// Returns the bytes drained and whether they ended at the prompt
    fn drain<C, W>(&self, session: &mut MonitorSession<C>, sink: &mut W) -> Result<(usize, bool)>
    where
        C: Channel,
        W: Write,
    {
        let chunk_size = self.settings.chunk_size.max(1);
        let mut total = 0usize;
        let mut tail = Vec::with_capacity(COMMAND_PROMPT.len() + chunk_size);
        let mut last_activity = Instant::now();

        loop {
            let available = session.bytes_available()?;

            if available > 0 {
                let data = session.read_available(available.min(chunk_size))?;
                sink.write_all(&data)?;
                tail.extend_from_slice(&data);
                let excess = tail.len().saturating_sub(COMMAND_PROMPT.len());
                tail.drain(..excess);
                total += data.len();
                debug!("Read {} bytes ({} total)", data.len(), total);
                log::trace!("{:?}", String::from_utf8_lossy(&data));
                last_activity = Instant::now();
            } else if last_activity.elapsed() >= self.settings.settle_delay {
                break;
            }

            thread::sleep(self.settings.poll_interval);
        }

        sink.flush()?;
        Ok((total, tail.ends_with(COMMAND_PROMPT)))
    }
}
