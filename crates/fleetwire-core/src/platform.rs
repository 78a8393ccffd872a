//! One-time process-wide setup.
//!
//! A write to a socket whose peer has closed its read side raises `SIGPIPE`
//! on Unix, which by default terminates the process. [`network_init`]
//! disables that so a failed write surfaces as an `Err` from [`crate::io`]
//! instead. The install is process-wide and idempotent, guarded by an atomic
//! compare-and-swap - deliberately the one piece of global mutable
//! state this crate keeps, because the signal disposition itself is a
//! process-wide resource with no per-connection equivalent.

use std::sync::atomic::{AtomicBool, Ordering};

static SIGPIPE_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Disables `SIGPIPE` termination for the current process, once.
///
/// Safe to call from multiple threads or multiple times; only the first
/// caller to win the compare-and-swap installs the handler. On non-Unix
/// platforms where `SIGPIPE` does not exist, this is a no-op.
///
/// Uses `signal-hook`'s signal iterator to drain and discard `SIGPIPE`
/// deliveries on a dedicated background thread, rather than an unsafe raw
/// `signal(2)`/`sigaction(2)` call - this workspace denies `unsafe_code`.
pub fn network_init() {
    if SIGPIPE_INSTALLED.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err()
    {
        return;
    }

    install_sigpipe_ignore();
}

#[cfg(unix)]
fn install_sigpipe_ignore() {
    use signal_hook::iterator::Signals;

    match Signals::new([signal_hook::consts::SIGPIPE]) {
        Ok(mut signals) => {
            std::thread::Builder::new()
                .name("fleetwire-sigpipe-reaper".into())
                .spawn(move || {
                    for _ in signals.forever() {
                        // Each delivery just needs to be drained so the
                        // default terminate-on-SIGPIPE action never fires.
                    }
                })
                .expect("failed to spawn SIGPIPE reaper thread");
        },
        Err(err) => {
            tracing::warn!(%err, "failed to install SIGPIPE handler; broken-pipe writes may raise SIGPIPE");
        },
    }
}

#[cfg(not(unix))]
fn install_sigpipe_ignore() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_init_is_idempotent() {
        network_init();
        network_init();
        assert!(SIGPIPE_INSTALLED.load(Ordering::Acquire));
    }
}
