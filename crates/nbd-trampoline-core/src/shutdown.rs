use crate::command::TranslatedCommand;
use crate::endpoint::TransportEndpoint;
use crate::error::SpawnError;
use crate::process::{ProcessControl, SignalSource};
use crate::supervisor::ChildProcessSupervisor;
use std::fmt;
use tracing::{debug, error, warn};

/// Orderly shutdown progress; there is no way back to `Running`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    Disconnecting,
    Killing,
    Reaping,
    Done,
}

impl fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownPhase::Running => "running",
            ShutdownPhase::Disconnecting => "disconnecting",
            ShutdownPhase::Killing => "killing",
            ShutdownPhase::Reaping => "reaping",
            ShutdownPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// What went wrong while tearing down; teardown itself always completes
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub disconnect_error: Option<SpawnError>,
    pub reap_error: Option<std::io::Error>,
}

/// Drives disconnect, kill, reap and endpoint removal
#[derive(Debug)]
pub struct ShutdownSequencer<'a> {
    endpoint: &'a TransportEndpoint,
    phase: ShutdownPhase,
}

impl<'a> ShutdownSequencer<'a> {
    pub fn new(endpoint: &'a TransportEndpoint) -> Self {
        Self {
            endpoint,
            phase: ShutdownPhase::Running,
        }
    }

    /// Full sequence: run `disconnect`, kill everything else, reap, clean up
    pub fn shutdown<C: ProcessControl, S: SignalSource>(
        mut self,
        supervisor: &mut ChildProcessSupervisor<C, S>,
        disconnect: &TranslatedCommand,
    ) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        self.enter(ShutdownPhase::Disconnecting);
        let helper = match supervisor.spawn(disconnect) {
            Ok(pid) => Some(pid),
            Err(e) => {
                error!("failed to run disconnect helper: {e}");
                report.disconnect_error = Some(e);
                None
            }
        };

        self.enter(ShutdownPhase::Killing);
        supervisor.kill_all_except(helper);

        self.finish(supervisor, &mut report);
        report
    }

    /// Teardown for startup failures, before any device was attached
    pub fn abort<C: ProcessControl, S: SignalSource>(
        mut self,
        supervisor: &mut ChildProcessSupervisor<C, S>,
    ) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        self.enter(ShutdownPhase::Killing);
        supervisor.kill_all_except(None);

        self.finish(supervisor, &mut report);
        report
    }

    fn finish<C: ProcessControl, S: SignalSource>(
        &mut self,
        supervisor: &mut ChildProcessSupervisor<C, S>,
        report: &mut ShutdownReport,
    ) {
        self.enter(ShutdownPhase::Reaping);
        if let Err(e) = supervisor.reap_all() {
            error!("wait failed while reaping children: {e}");
            report.reap_error = Some(e);
        }

        self.enter(ShutdownPhase::Done);
        if let Err(e) = self.endpoint.remove() {
            warn!("failed to remove {}: {e}", self.endpoint);
        }
    }

    fn enter(&mut self, phase: ShutdownPhase) {
        debug!("shutdown: {} -> {phase}", self.phase);
        self.phase = phase;
    }
}
