use nbd_trampoline_core::SignalSource;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Signals that request an orderly shutdown
pub const TERMINATION_SIGNALS: [Signal; 4] = [
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTERM,
];

// The only state shared with signal context
static PENDING: AtomicBool = AtomicBool::new(false);
static LAST_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn record_signal(signal: c_int) {
    LAST_SIGNAL.store(signal, Ordering::Relaxed);
    PENDING.store(true, Ordering::SeqCst);
}

/// Turns termination signals into a flag the supervision loop polls.
///
/// Handlers are installed without `SA_RESTART`, so a blocking `wait(2)` in the
/// main loop returns `EINTR` when one of these signals arrives.
#[derive(Debug)]
pub struct UnixSignalBridge {
    _installed: (),
}

impl UnixSignalBridge {
    pub fn install() -> nix::Result<Self> {
        let action = SigAction::new(
            SigHandler::Handler(record_signal),
            SaFlags::empty(),
            SigSet::empty(),
        );
        for signal in TERMINATION_SIGNALS {
            // SAFETY: the handler only touches atomics
            unsafe { sigaction(signal, &action) }?;
        }
        Ok(Self { _installed: () })
    }

    /// Put the default dispositions back
    pub fn restore_defaults() -> nix::Result<()> {
        let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        for signal in TERMINATION_SIGNALS {
            // SAFETY: restoring the default disposition installs no code
            unsafe { sigaction(signal, &action) }?;
        }
        Ok(())
    }
}

impl SignalSource for UnixSignalBridge {
    fn take_pending(&self) -> Option<i32> {
        if PENDING.swap(false, Ordering::SeqCst) {
            Some(LAST_SIGNAL.load(Ordering::Relaxed))
        } else {
            None
        }
    }
}
