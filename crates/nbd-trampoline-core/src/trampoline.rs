use crate::endpoint::TransportEndpoint;
use crate::error::TrampolineError;
use crate::process::{ProcessControl, ProcessId, SignalSource};
use crate::readiness::ReadinessWaiter;
use crate::shutdown::ShutdownSequencer;
use crate::supervisor::{ChildProcessSupervisor, WaitOutcome};
use crate::translate::{ArgumentTranslator, Invocation};
use tracing::{debug, info};

/// Hook run once the server has daemonized itself and before the client starts.
///
/// Implementations detach the trampoline from its terminal and switch logging
/// to a background sink.
pub trait BackgroundTransition {
    fn enter_background(&mut self, invocation: &Invocation) -> Result<(), TrampolineError>;
}

/// Foreground-only runs never call the hook
pub struct StayInForeground;

impl BackgroundTransition for StayInForeground {
    fn enter_background(&mut self, _invocation: &Invocation) -> Result<(), TrampolineError> {
        Ok(())
    }
}

/// Connects a bucket to a block device through a server/client process pair
pub struct Trampoline<C, S> {
    translator: ArgumentTranslator,
    readiness: ReadinessWaiter,
    supervisor: ChildProcessSupervisor<C, S>,
}

impl<C: ProcessControl, S: SignalSource> Trampoline<C, S> {
    pub fn new(translator: ArgumentTranslator, control: C, signals: S) -> Self {
        let readiness = ReadinessWaiter::new(translator.settings().readiness.clone());
        Self {
            translator,
            readiness,
            supervisor: ChildProcessSupervisor::new(control, signals),
        }
    }

    pub fn supervisor(&self) -> &ChildProcessSupervisor<C, S> {
        &self.supervisor
    }

    /// Run until the server exits or a termination signal arrives.
    ///
    /// Either the whole pipeline comes up or nothing is left running: every
    /// exit path after the server spawn goes through the shutdown sequencer.
    pub fn run(
        &mut self,
        invocation: &Invocation,
        endpoint: &TransportEndpoint,
        background: &mut impl BackgroundTransition,
    ) -> Result<(), TrampolineError> {
        let server = self
            .supervisor
            .spawn(&self.translator.server_command(invocation, endpoint))?;

        let client = match self.start_client(invocation, endpoint, server, background) {
            Ok(client) => client,
            Err(e) => {
                debug!("aborting startup: {e}");
                ShutdownSequencer::new(endpoint).abort(&mut self.supervisor);
                return Err(e);
            }
        };

        let supervised = self.supervise(invocation, server, client);

        let disconnect = self.translator.disconnect_command(invocation);
        let report = ShutdownSequencer::new(endpoint).shutdown(&mut self.supervisor, &disconnect);
        info!("{} disconnected from {}", invocation.bucket, invocation.device.display());

        supervised?;
        if let Some(e) = report.disconnect_error {
            return Err(e.into());
        }
        if let Some(e) = report.reap_error {
            return Err(TrampolineError::Wait(e));
        }
        Ok(())
    }

    fn start_client(
        &mut self,
        invocation: &Invocation,
        endpoint: &TransportEndpoint,
        server: ProcessId,
        background: &mut impl BackgroundTransition,
    ) -> Result<ProcessId, TrampolineError> {
        // A backgrounded server forks off, so its launcher exits first
        if !invocation.config.foreground {
            match self
                .supervisor
                .wait_for_any(false)
                .map_err(TrampolineError::Wait)?
            {
                WaitOutcome::Exited(pid) if pid == server => {}
                WaitOutcome::Interrupted => return Err(TrampolineError::SetupInterrupted),
                WaitOutcome::Exited(pid) => return Err(TrampolineError::UnexpectedExit { pid }),
                WaitOutcome::NoneLeft => {
                    return Err(TrampolineError::UnexpectedExit { pid: server });
                }
            }
            background.enter_background(invocation)?;
        }

        let ready = self
            .readiness
            .await_artifact(endpoint.path())
            .map_err(|source| TrampolineError::Readiness {
                path: endpoint.path().to_path_buf(),
                source,
            })?;
        if !ready {
            return Err(TrampolineError::ReadinessTimeout {
                executable: self.translator.settings().server_executable.clone(),
                waited_ms: self.readiness.config().max_wait_ms,
            });
        }
        debug!("{endpoint} is ready");

        let client = self
            .supervisor
            .spawn(&self.translator.client_command(invocation, endpoint))?;
        Ok(client)
    }

    fn supervise(
        &mut self,
        invocation: &Invocation,
        server: ProcessId,
        client: ProcessId,
    ) -> Result<(), TrampolineError> {
        let block_if_empty = !invocation.config.foreground;
        let mut client = Some(client);
        loop {
            match self
                .supervisor
                .wait_for_any(block_if_empty)
                .map_err(TrampolineError::Wait)?
            {
                WaitOutcome::Exited(pid) if Some(pid) == client => {
                    info!("{} process {pid} exited", self.translator.settings().client_executable);
                    client = None;
                }
                WaitOutcome::Exited(pid) if pid == server => {
                    info!("{} process {pid} exited", self.translator.settings().server_executable);
                    return Ok(());
                }
                WaitOutcome::Exited(pid) => {
                    info!("child process {pid} exited");
                    return Ok(());
                }
                WaitOutcome::Interrupted => {
                    info!("termination requested, shutting down");
                    return Ok(());
                }
                WaitOutcome::NoneLeft => return Ok(()),
            }
        }
    }
}
