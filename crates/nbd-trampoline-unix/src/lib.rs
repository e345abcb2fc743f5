#[cfg(unix)]
mod endpoint;
#[cfg(unix)]
mod signals;
#[cfg(unix)]
mod unix_process_control;

#[cfg(unix)]
pub use endpoint::SocketPathResolver;
#[cfg(unix)]
pub use signals::{TERMINATION_SIGNALS, UnixSignalBridge};
#[cfg(unix)]
pub use unix_process_control::UnixProcessControl;

pub struct UnixPlatformFactory;

#[cfg(unix)]
impl UnixPlatformFactory {
    pub fn create_process_control() -> UnixProcessControl {
        UnixProcessControl::new()
    }

    pub fn install_signal_bridge() -> nix::Result<UnixSignalBridge> {
        UnixSignalBridge::install()
    }

    pub fn platform_name() -> &'static str {
        "Unix"
    }
}
