//! NBD trampoline core - platform-independent supervision logic
//!
//! This crate provides argument translation, endpoint naming, the child
//! process supervisor, readiness polling and the shutdown sequence. The
//! operating system is reached only through the [`ProcessControl`] and
//! [`SignalSource`] traits, which platform crates implement.

mod command;
mod config;
mod endpoint;
mod error;
mod flags;
mod process;
mod readiness;
mod shutdown;
mod supervisor;
mod trampoline;
mod translate;

pub use command::*;
pub use config::*;
pub use endpoint::*;
pub use error::*;
pub use flags::*;
pub use process::*;
pub use readiness::*;
pub use shutdown::*;
pub use supervisor::{ChildProcessSupervisor, ChildRegistry, MAX_CHILD_PROCESSES, WaitOutcome};
pub use trampoline::*;
pub use translate::*;
