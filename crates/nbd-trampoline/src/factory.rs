use nbd_trampoline_core::TrampolineError;
use std::path::Path;

#[cfg(unix)]
pub type PlatformProcessControl = nbd_trampoline_unix::UnixProcessControl;

#[cfg(unix)]
pub type PlatformSignalBridge = nbd_trampoline_unix::UnixSignalBridge;

#[cfg(unix)]
pub type PlatformResolver = nbd_trampoline_unix::SocketPathResolver;

/// Selects the process, signal and endpoint implementations at compile time
pub struct PlatformFactory;

impl PlatformFactory {
    pub fn create_process_control() -> PlatformProcessControl {
        #[cfg(unix)]
        return nbd_trampoline_unix::UnixPlatformFactory::create_process_control();
    }

    /// Must run before the first child is spawned
    pub fn install_signal_bridge() -> Result<PlatformSignalBridge, TrampolineError> {
        #[cfg(unix)]
        return nbd_trampoline_unix::UnixPlatformFactory::install_signal_bridge()
            .map_err(|e| TrampolineError::SignalSetup(e.into()));
    }

    pub fn endpoint_resolver(socket_dir: &Path) -> PlatformResolver {
        #[cfg(unix)]
        return nbd_trampoline_unix::SocketPathResolver::new(socket_dir);
    }

    pub fn platform_name() -> &'static str {
        #[cfg(unix)]
        return nbd_trampoline_unix::UnixPlatformFactory::platform_name();
    }
}
