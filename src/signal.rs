//! Cancellation for blocking waits
//!
//! Startup detection waits on the operator pressing the reset button, so it
//! has no internal timeout. It polls a `CancelToken` instead, which the
//! binary wires to Ctrl+C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag checked by long-running waits
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Install a Ctrl+C handler and return a token it cancels
///
/// The first Ctrl+C cancels the token. A second one exits immediately, in
/// case the program is stuck somewhere that does not poll the token.
pub fn install_interrupt_handler() -> std::io::Result<CancelToken> {
    let token = CancelToken::new();

    #[cfg(unix)]
    unix::install(token.clone())?;

    Ok(token)
}

#[cfg(unix)]
mod unix {
    use super::CancelToken;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    static INTERRUPTED: AtomicBool = AtomicBool::new(false);

    pub fn install(token: CancelToken) -> std::io::Result<()> {
        let previous = unsafe { libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error());
        }

        // Signal handlers may only touch atomics, so a watcher thread forwards
        // the flag to the token.
        thread::spawn(move || {
            while !INTERRUPTED.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(50));
            }
            log::debug!("Interrupt received");
            token.cancel();
        });

        Ok(())
    }

    extern "C" fn handle_sigint(_: libc::c_int) {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            unsafe { libc::_exit(130) };
        }
    }
}
