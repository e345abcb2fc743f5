use nbd_trampoline_core::{ProcessControl, ProcessId, Reaped, TerminationResult, TranslatedCommand};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitStatus, wait};
use nix::unistd::Pid as NixPid;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long to sleep between signal checks when no child is left to wait on
const IDLE_INTERVAL: Duration = Duration::from_millis(50);

/// Process primitives on top of fork/exec, `wait(2)` and `kill(2)`
pub struct UnixProcessControl {
    idle_interval: Duration,
}

impl Default for UnixProcessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl UnixProcessControl {
    pub fn new() -> Self {
        Self {
            idle_interval: IDLE_INTERVAL,
        }
    }
}

impl ProcessControl for UnixProcessControl {
    fn spawn(&mut self, command: &TranslatedCommand) -> std::io::Result<ProcessId> {
        // The child is reaped through wait(2), never through the std handle
        let child = Command::new(command.program())
            .args(command.args())
            .spawn()?;
        Ok(child.id())
    }

    fn wait_any(&mut self) -> std::io::Result<Reaped> {
        loop {
            match wait() {
                Ok(WaitStatus::Exited(pid, code)) => {
                    debug!("process {pid} exited with status {code}");
                    return Ok(Reaped::Child(pid.as_raw() as ProcessId));
                }
                Ok(WaitStatus::Signaled(pid, sig, _)) => {
                    debug!("process {pid} terminated by {sig}");
                    return Ok(Reaped::Child(pid.as_raw() as ProcessId));
                }
                Ok(other) => {
                    debug!("ignoring wait status {other:?}");
                }
                Err(Errno::EINTR) => return Ok(Reaped::Interrupted),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn terminate(&mut self, pid: ProcessId) -> TerminationResult {
        let nix_pid = NixPid::from_raw(pid as i32);

        match signal::kill(nix_pid, Signal::SIGTERM) {
            Ok(()) => {
                info!("Sent SIGTERM to process {pid}");
                TerminationResult::Success
            }
            Err(Errno::ESRCH) => {
                info!("Process {pid} not found (already terminated)");
                TerminationResult::ProcessNotFound
            }
            Err(Errno::EPERM) => {
                warn!("Permission denied to terminate process {pid}");
                TerminationResult::AccessDenied
            }
            Err(e) => {
                warn!("Failed to send SIGTERM to process {pid}: {e}");
                TerminationResult::Failed(format!("SIGTERM failed: {e}"))
            }
        }
    }

    fn idle(&mut self) {
        std::thread::sleep(self.idle_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::UnixSignalBridge;
    use nbd_trampoline_core::SignalSource;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_spawn_and_reap() {
        let mut control = UnixProcessControl::new();
        let pid = control
            .spawn(&TranslatedCommand::new("true", Vec::<String>::new()))
            .unwrap();
        assert_eq!(control.wait_any().unwrap(), Reaped::Child(pid));
    }

    #[test]
    #[serial]
    fn test_spawn_missing_executable() {
        let mut control = UnixProcessControl::new();
        let err = control
            .spawn(&TranslatedCommand::new("/nonexistent/nbd-client", ["-d"]))
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    #[serial]
    fn test_terminate_running_child() {
        let mut control = UnixProcessControl::new();
        let pid = control
            .spawn(&TranslatedCommand::new("sleep", ["30"]))
            .unwrap();

        assert_eq!(control.terminate(pid), TerminationResult::Success);
        assert_eq!(control.wait_any().unwrap(), Reaped::Child(pid));
        // Reaped processes no longer exist
        assert_eq!(control.terminate(pid), TerminationResult::ProcessNotFound);
    }

    #[test]
    #[serial]
    fn test_wait_with_no_children_fails() {
        let mut control = UnixProcessControl::new();
        let err = control.wait_any().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(Errno::ECHILD as i32));
    }

    #[test]
    #[serial]
    fn test_signal_interrupts_wait() {
        let bridge = UnixSignalBridge::install().unwrap();
        let mut control = UnixProcessControl::new();
        let pid = control
            .spawn(&TranslatedCommand::new("sleep", ["30"]))
            .unwrap();

        let waiter = nix::sys::pthread::pthread_self();
        let sender = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            nix::sys::pthread::pthread_kill(waiter, Signal::SIGHUP).unwrap();
        });

        assert_eq!(control.wait_any().unwrap(), Reaped::Interrupted);
        assert_eq!(bridge.take_pending(), Some(Signal::SIGHUP as i32));
        sender.join().unwrap();

        control.terminate(pid);
        assert_eq!(control.wait_any().unwrap(), Reaped::Child(pid));
        UnixSignalBridge::restore_defaults().unwrap();
    }
}
