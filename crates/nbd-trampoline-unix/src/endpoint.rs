use nbd_trampoline_core::{DeviceIdentity, TrampolineError, TransportEndpoint};
use nix::errno::Errno;
use nix::sys::stat::stat;
use nix::unistd::unlink;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maps a block device to its endpoint and clears what a previous run left there
#[derive(Debug, Clone)]
pub struct SocketPathResolver {
    socket_dir: PathBuf,
}

impl SocketPathResolver {
    pub fn new(socket_dir: impl Into<PathBuf>) -> Self {
        Self {
            socket_dir: socket_dir.into(),
        }
    }

    /// Identity of the device node, padded to the native field widths
    #[allow(clippy::unnecessary_cast)]
    pub fn device_identity(device: &Path) -> Result<DeviceIdentity, TrampolineError> {
        let sb = stat(device).map_err(|e| TrampolineError::DeviceLookup {
            path: device.to_path_buf(),
            source: e.into(),
        })?;
        Ok(DeviceIdentity::with_widths(
            sb.st_dev as u64,
            sb.st_ino as u64,
            size_of_val(&sb.st_dev),
            size_of_val(&sb.st_ino),
        ))
    }

    /// Endpoint for `device`, with any stale artifact removed.
    ///
    /// Fails with [`TrampolineError::InsufficientPrivilege`] when the endpoint
    /// location cannot even be examined by the current user.
    pub fn resolve(&self, device: &Path) -> Result<TransportEndpoint, TrampolineError> {
        let identity = Self::device_identity(device)?;
        let endpoint = TransportEndpoint::for_device(&self.socket_dir, identity);
        let path = endpoint.path();

        match unlink(path) {
            Ok(()) => debug!("removed leftover {}", path.display()),
            Err(Errno::ENOENT) => {}
            Err(e) => debug!("could not remove {}: {e}", path.display()),
        }

        match stat(path) {
            Ok(_) => {
                warn!("{} still exists after cleanup", path.display());
                Ok(endpoint)
            }
            Err(Errno::ENOENT) => Ok(endpoint),
            Err(Errno::EPERM | Errno::EACCES) => Err(TrampolineError::InsufficientPrivilege {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(TrampolineError::Endpoint {
                path: path.to_path_buf(),
                source: e.into(),
            }),
        }
    }
}
