//! Signal-driven stop and mark requests
//!
//! Handlers only store into atomics; the sampling loop polls the flags at the
//! top of each tick, so sensors are never touched from signal context and a
//! signal arriving mid-wait takes effect once the wait has finished.

use crate::error::Result;
use log::debug;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};

/// Signals that request a graceful stop
pub const STOP_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGQUIT];

/// Signal that requests a separator line in the output
pub const MARK_SIGNAL: Signal = Signal::SIGUSR1;

/// Stop and mark requests
#[derive(Debug)]
pub struct TerminationState {
    stop: AtomicBool,
    mark: AtomicBool,
}

impl TerminationState {
    pub const fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            mark: AtomicBool::new(false),
        }
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn request_mark(&self) {
        self.mark.store(true, Ordering::SeqCst);
    }

    /// Consume a pending mark request
    pub fn take_mark(&self) -> bool {
        self.mark.swap(false, Ordering::SeqCst)
    }
}

impl Default for TerminationState {
    fn default() -> Self {
        Self::new()
    }
}

static SIGNAL_STATE: TerminationState = TerminationState::new();

extern "C" fn on_stop_signal(_: libc::c_int) {
    SIGNAL_STATE.request_stop();
}

extern "C" fn on_mark_signal(_: libc::c_int) {
    SIGNAL_STATE.request_mark();
}

/// Installed signal handlers; dropping restores the previous dispositions
pub struct SignalHandlers {
    previous: Vec<(Signal, SigAction)>,
}

impl SignalHandlers {
    /// Route the stop and mark signals to the process-wide state.
    ///
    /// `SA_RESTART` is deliberately left out: the absolute sleep sees `EINTR`
    /// and resumes towards the same deadline.
    pub fn install() -> Result<Self> {
        let mut handlers = Self {
            previous: Vec::with_capacity(STOP_SIGNALS.len() + 1),
        };

        let stop = SigAction::new(
            SigHandler::Handler(on_stop_signal),
            SaFlags::empty(),
            SigSet::empty(),
        );
        for signal in STOP_SIGNALS {
            handlers.replace(signal, &stop)?;
        }

        let mark = SigAction::new(
            SigHandler::Handler(on_mark_signal),
            SaFlags::empty(),
            SigSet::empty(),
        );
        handlers.replace(MARK_SIGNAL, &mark)?;

        debug!("signal handlers installed");
        Ok(handlers)
    }

    fn replace(&mut self, signal: Signal, action: &SigAction) -> Result<()> {
        // SAFETY: the handlers only perform atomic stores
        let previous = unsafe { sigaction(signal, action) }?;
        self.previous.push((signal, previous));
        Ok(())
    }

    /// State the installed handlers write to
    pub fn state(&self) -> &'static TerminationState {
        &SIGNAL_STATE
    }
}

impl Drop for SignalHandlers {
    fn drop(&mut self) {
        for (signal, action) in self.previous.drain(..).rev() {
            // SAFETY: reinstating the disposition that was in place before
            if let Err(e) = unsafe { sigaction(signal, &action) } {
                debug!("failed to restore {:?}: {}", signal, e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nix::sys::signal::raise;
    use std::sync::{Mutex, MutexGuard};

    static DISPOSITIONS: Mutex<()> = Mutex::new(());

    /// Serialises tests that install handlers; a concurrent restore would
    /// otherwise reset SIGTERM to its default action mid-test
    pub(crate) fn lock_dispositions() -> MutexGuard<'static, ()> {
        DISPOSITIONS.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_flags_are_independent() {
        let state = TerminationState::new();
        state.request_mark();
        assert!(!state.stop_requested());
        assert!(state.take_mark());
        assert!(!state.take_mark());

        state.request_stop();
        assert!(state.stop_requested());
        assert!(!state.take_mark());
    }

    #[test]
    fn test_signals_set_flags() {
        let _guard = lock_dispositions();
        let handlers = SignalHandlers::install().unwrap();
        let state = handlers.state();

        raise(MARK_SIGNAL).unwrap();
        assert!(state.take_mark());
        assert!(!state.stop_requested());

        raise(Signal::SIGTERM).unwrap();
        assert!(state.stop_requested());
        drop(handlers);
    }
}
