use crate::command::TranslatedCommand;

/// Unique identifier for a process
pub type ProcessId = u32;

/// Result of a single blocking wait on the operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaped {
    /// A child exited (normally or by signal) and has been reaped
    Child(ProcessId),
    /// The wait was cut short by signal delivery
    Interrupted,
}

/// Result of a process termination request
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationResult {
    /// Termination request was delivered
    Success,
    /// Process was not found (already exited)
    ProcessNotFound,
    /// Permission denied (insufficient privileges)
    AccessDenied,
    /// Request failed with specific error message
    Failed(String),
}

/// Operating system primitives the supervisor is built on.
///
/// Only `ChildProcessSupervisor` calls these; nothing else in the crate may
/// wait for or signal child processes directly.
pub trait ProcessControl {
    /// Fork and exec `command`, returning the new child's identity
    fn spawn(&mut self, command: &TranslatedCommand) -> std::io::Result<ProcessId>;

    /// Block until any child exits or a signal interrupts the wait
    fn wait_any(&mut self) -> std::io::Result<Reaped>;

    /// Ask a process to terminate
    fn terminate(&mut self, pid: ProcessId) -> TerminationResult;

    /// Sleep briefly while there is nothing to wait for
    fn idle(&mut self);
}

/// Consumer side of the signal bridge
pub trait SignalSource {
    /// Return and clear the pending termination request, if any
    fn take_pending(&self) -> Option<i32>;
}
