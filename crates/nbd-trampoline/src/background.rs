use crate::logging::LogHandle;
use daemonize::Daemonize;
use nbd_trampoline_core::{BackgroundTransition, Invocation, TrampolineError};
use tracing::info;

/// Detaches the trampoline once the server has gone to the background.
///
/// The terminal learns which bucket is being connected; everything after the
/// fork is logged to the journal.
pub struct Daemonizer {
    logging: LogHandle,
}

impl Daemonizer {
    pub fn new(logging: LogHandle) -> Self {
        Self { logging }
    }
}

impl BackgroundTransition for Daemonizer {
    fn enter_background(&mut self, invocation: &Invocation) -> Result<(), TrampolineError> {
        info!(
            "connecting {} to {}",
            invocation.bucket,
            invocation.device.display()
        );

        Daemonize::new()
            .start()
            .map_err(|e| TrampolineError::Background(e.to_string()))?;

        self.logging.switch_to_journald();
        info!(
            "trampoline for {} running as process {}",
            invocation.bucket,
            std::process::id()
        );
        Ok(())
    }
}
