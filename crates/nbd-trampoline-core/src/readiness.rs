use crate::config::ReadinessConfig;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Bounded poll for a filesystem artifact created by another process
#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    config: ReadinessConfig,
}

impl ReadinessWaiter {
    pub fn new(config: ReadinessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Returns `Ok(true)` as soon as `path` exists and `Ok(false)` once the
    /// wait budget is spent. Any stat failure other than "not found" is an error.
    pub fn await_artifact(&self, path: &Path) -> std::io::Result<bool> {
        let pause = self.config.poll_interval();
        let budget = self.config.max_wait();
        let start = Instant::now();
        loop {
            match std::fs::metadata(path) {
                Ok(_) => {
                    debug!("{} appeared after {:?}", path.display(), start.elapsed());
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            let elapsed = start.elapsed();
            if elapsed >= budget {
                return Ok(false);
            }
            std::thread::sleep(pause.min(budget - elapsed));
        }
    }
}
