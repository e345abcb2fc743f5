use std::fmt;
use std::path::{Path, PathBuf};

/// The (device-number, inode-number) pair of a block device node, with the
/// native hex width of each field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub device: u64,
    pub inode: u64,
    device_width: usize,
    inode_width: usize,
}

impl DeviceIdentity {
    /// Identity whose fields are each `u64` wide
    pub fn new(device: u64, inode: u64) -> Self {
        Self::with_widths(device, inode, size_of::<u64>(), size_of::<u64>())
    }

    /// Identity whose fields occupy the given number of bytes natively
    pub fn with_widths(device: u64, inode: u64, device_bytes: usize, inode_bytes: usize) -> Self {
        Self {
            device,
            inode,
            device_width: device_bytes * 2,
            inode_width: inode_bytes * 2,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0dw$x}_{:0iw$x}",
            self.device,
            self.inode,
            dw = self.device_width,
            iw = self.inode_width
        )
    }
}

/// Socket path joining the server and client for one target device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportEndpoint {
    path: PathBuf,
}

impl TransportEndpoint {
    pub fn for_device(socket_dir: impl AsRef<Path>, identity: DeviceIdentity) -> Self {
        Self {
            path: socket_dir.as_ref().join(identity.to_string()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the artifact; a missing file is not an error
    pub fn remove(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TransportEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
