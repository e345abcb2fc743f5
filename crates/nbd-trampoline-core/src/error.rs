use crate::process::ProcessId;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed command line; always detected before anything is spawned
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("invalid flag \"{0}\"")]
    InvalidFlag(String),

    #[error("boolean flag \"--{flag}\" value must be \"true\", got \"{value}\"")]
    NotBoolean { flag: String, value: String },

    #[error("flag \"--{0}\" requires a value")]
    MissingValue(String),

    #[error("expected bucket and device arguments, found {found} positional argument(s)")]
    Positionals { found: usize },
}

/// Failure to start a child process
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("child process table is full ({capacity} entries)")]
    RegistryFull { capacity: usize },

    #[error("{executable}: {source}")]
    Launch {
        executable: String,
        #[source]
        source: std::io::Error,
    },
}

/// Every way a trampoline run can fail
#[derive(Error, Debug)]
pub enum TrampolineError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("{}: {source}", path.display())]
    DeviceLookup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("must be run as root when the \"--nbd\" flag is used ({})", path.display())]
    InsufficientPrivilege { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Endpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error("{executable} failed to start within {waited_ms}ms")]
    ReadinessTimeout { executable: String, waited_ms: u64 },

    #[error("{}: {source}", path.display())]
    Readiness {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sigaction: {0}")]
    SignalSetup(#[source] std::io::Error),

    #[error("wait: {0}")]
    Wait(#[source] std::io::Error),

    #[error("got signal during setup")]
    SetupInterrupted,

    #[error("unexpected exit of child process {pid}")]
    UnexpectedExit { pid: ProcessId },

    #[error("failed to enter background: {0}")]
    Background(String),

    #[error("settings: {0:#}")]
    Settings(#[from] anyhow::Error),
}

impl TrampolineError {
    /// Usage errors ask the caller to print usage text before exiting
    pub fn is_usage_error(&self) -> bool {
        matches!(self, TrampolineError::Translation(_))
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_usage_error() { 2 } else { 1 }
    }
}
