use crate::command::TranslatedCommand;
use crate::error::SpawnError;
use crate::process::{ProcessControl, ProcessId, Reaped, SignalSource, TerminationResult};
use tracing::{debug, info, warn};

/// Server, client and disconnect helper, with room to spare
pub const MAX_CHILD_PROCESSES: usize = 10;

/// Live children, in spawn order
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: Vec<ProcessId>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self {
            pids: Vec::with_capacity(MAX_CHILD_PROCESSES),
        }
    }

    pub fn is_full(&self) -> bool {
        self.pids.len() >= MAX_CHILD_PROCESSES
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn contains(&self, pid: ProcessId) -> bool {
        self.pids.contains(&pid)
    }

    pub fn pids(&self) -> &[ProcessId] {
        &self.pids
    }

    fn insert(&mut self, pid: ProcessId) {
        assert!(!self.is_full(), "child registry overflow");
        self.pids.push(pid);
    }

    fn remove(&mut self, pid: ProcessId) -> bool {
        match self.pids.iter().position(|p| *p == pid) {
            Some(index) => {
                self.pids.remove(index);
                true
            }
            None => false,
        }
    }
}

/// What [`ChildProcessSupervisor::wait_for_any`] observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A registered child exited and was deregistered
    Exited(ProcessId),
    /// A termination signal is pending; the registry is untouched
    Interrupted,
    /// Nothing registered and the caller asked not to block
    NoneLeft,
}

/// Owns the child registry and is the only caller of the OS wait/kill primitives
pub struct ChildProcessSupervisor<C, S> {
    control: C,
    signals: S,
    registry: ChildRegistry,
}

impl<C: ProcessControl, S: SignalSource> ChildProcessSupervisor<C, S> {
    pub fn new(control: C, signals: S) -> Self {
        Self {
            control,
            signals,
            registry: ChildRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ChildRegistry {
        &self.registry
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    /// Start `command` and track it until it is reaped
    pub fn spawn(&mut self, command: &TranslatedCommand) -> Result<ProcessId, SpawnError> {
        if self.registry.is_full() {
            return Err(SpawnError::RegistryFull {
                capacity: MAX_CHILD_PROCESSES,
            });
        }

        debug!("executing {} with these parameters:", command.program());
        for (index, arg) in command.argv().enumerate() {
            debug!("  [{index:02}] \"{arg}\"");
        }

        let pid = self
            .control
            .spawn(command)
            .map_err(|source| SpawnError::Launch {
                executable: command.program().to_string(),
                source,
            })?;
        self.registry.insert(pid);

        info!("started {} as process {pid}", command.program());
        Ok(pid)
    }

    /// Wait until a registered child exits or a termination signal is pending.
    ///
    /// With an empty registry this returns [`WaitOutcome::NoneLeft`] at once
    /// unless `block_if_empty` is set, in which case only a signal ends the wait.
    pub fn wait_for_any(&mut self, block_if_empty: bool) -> std::io::Result<WaitOutcome> {
        loop {
            if let Some(signal) = self.signals.take_pending() {
                debug!("rec'd signal {signal} while waiting");
                return Ok(WaitOutcome::Interrupted);
            }

            if self.registry.is_empty() {
                if !block_if_empty {
                    return Ok(WaitOutcome::NoneLeft);
                }
                self.control.idle();
                continue;
            }

            match self.control.wait_any()? {
                Reaped::Child(pid) => {
                    if self.registry.remove(pid) {
                        debug!("reaped child {pid}");
                        return Ok(WaitOutcome::Exited(pid));
                    }
                    debug!("reaped untracked process {pid}");
                }
                Reaped::Interrupted => {}
            }
        }
    }

    /// Send a termination request to every registered child except `except`
    pub fn kill_all_except(&mut self, except: Option<ProcessId>) {
        let targets: Vec<ProcessId> = self
            .registry
            .pids()
            .iter()
            .copied()
            .filter(|pid| Some(*pid) != except)
            .collect();

        for pid in targets {
            debug!("killing child {pid}");
            match self.control.terminate(pid) {
                TerminationResult::Success => {}
                TerminationResult::ProcessNotFound => {
                    debug!("child {pid} already gone");
                }
                other => {
                    warn!("failed to terminate child {pid}: {other:?}");
                }
            }
        }
    }

    /// Reap until nothing is left; further signals are ignored meanwhile
    pub fn reap_all(&mut self) -> std::io::Result<()> {
        loop {
            match self.wait_for_any(false)? {
                WaitOutcome::NoneLeft => return Ok(()),
                WaitOutcome::Exited(_) | WaitOutcome::Interrupted => {}
            }
        }
    }
}
