//! Rewrites the trampoline's command line into server and client argv.
//!
//! The server's own argument parser is authoritative and order sensitive, so
//! every command is assembled in exactly the order an operator would type it.

use crate::command::TranslatedCommand;
use crate::config::{TrampolineConfig, TrampolineSettings};
use crate::endpoint::TransportEndpoint;
use crate::error::TranslationError;
use crate::flags::{FlagKind, FlagTable};
use std::path::PathBuf;

const NBD_SELECTOR: &str = "--nbd";
const NBD_FLAG: &str = "--nbd-flag";
const NBD_PARAM: &str = "--nbd-param";
const TERMINATOR: &str = "--";

/// A fully validated command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config: TrampolineConfig,
    /// `bucket[/subdir]`, forwarded as a single named server parameter
    pub bucket: String,
    /// Host block device, consumed only by the client commands
    pub device: PathBuf,
    extra_flags: Vec<String>,
    extra_params: Vec<String>,
    plugin_params: Vec<(String, String)>,
}

/// Turns raw arguments into an [`Invocation`] and invocations into argv
#[derive(Debug, Clone)]
pub struct ArgumentTranslator {
    settings: TrampolineSettings,
    flags: FlagTable,
}

impl ArgumentTranslator {
    pub fn new(settings: TrampolineSettings) -> Self {
        Self::with_flags(settings, FlagTable::plugin())
    }

    pub fn with_flags(settings: TrampolineSettings, flags: FlagTable) -> Self {
        Self { settings, flags }
    }

    pub fn settings(&self) -> &TrampolineSettings {
        &self.settings
    }

    /// Validate `raw` (program name excluded).
    pub fn translate<S: AsRef<str>>(&self, raw: &[S]) -> Result<Invocation, TranslationError> {
        let raw: Vec<&str> = raw.iter().map(AsRef::as_ref).collect();
        let mut extra_flags = Vec::new();
        let mut extra_params = Vec::new();
        let mut flags = Vec::new();

        // Leading flag run; the nbd extras are pulled out wherever they appear in it
        let mut index = 0;
        while index < raw.len() {
            let arg = raw[index];
            if !arg.starts_with('-') {
                break;
            }
            index += 1;
            if arg == TERMINATOR {
                break;
            }
            if !arg.starts_with(NBD_SELECTOR) {
                flags.push(arg);
                continue;
            }
            if arg == NBD_SELECTOR {
                continue;
            }
            let (name, value) = arg
                .split_once('=')
                .ok_or_else(|| TranslationError::InvalidFlag(arg.to_string()))?;
            match name {
                NBD_FLAG => extra_flags.push(value.to_string()),
                NBD_PARAM => extra_params.push(value.to_string()),
                _ => return Err(TranslationError::InvalidFlag(arg.to_string())),
            }
        }

        let positionals = &raw[index..];
        let [bucket, device] = positionals else {
            if let Some(stray) = positionals.iter().skip(1).find(|p| p.starts_with('-')) {
                return Err(TranslationError::InvalidFlag(stray.to_string()));
            }
            return Err(TranslationError::Positionals {
                found: positionals.len(),
            });
        };

        let mut mode = TrampolineConfig::builder();
        let mut plugin_params = Vec::new();
        for flag in flags {
            match flag {
                "-f" => {
                    mode.foreground(true);
                    continue;
                }
                "-d" => {
                    mode.debug(true).foreground(true);
                    continue;
                }
                _ => {}
            }

            let body = flag
                .strip_prefix("--")
                .ok_or_else(|| TranslationError::InvalidFlag(flag.to_string()))?;
            let (name, value) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };

            let value = match self.flags.kind(name) {
                Some(FlagKind::Boolean) => {
                    if let Some(value) = value.filter(|v| !v.eq_ignore_ascii_case("true")) {
                        return Err(TranslationError::NotBoolean {
                            flag: name.to_string(),
                            value: value.to_string(),
                        });
                    }
                    match name {
                        "debug" => {
                            mode.debug(true);
                        }
                        "readOnly" => {
                            mode.read_only(true);
                        }
                        _ => {}
                    }
                    "true"
                }
                Some(FlagKind::Valued) => {
                    value.ok_or_else(|| TranslationError::MissingValue(name.to_string()))?
                }
                None => return Err(TranslationError::InvalidFlag(flag.to_string())),
            };
            plugin_params.push((name.to_string(), value.to_string()));
        }

        Ok(Invocation {
            config: mode.build(),
            bucket: bucket.to_string(),
            device: PathBuf::from(device),
            extra_flags,
            extra_params,
            plugin_params,
        })
    }

    /// Server argv: base flags, extra flags, plugin, plugin params, bucket, extra params
    pub fn server_command(
        &self,
        invocation: &Invocation,
        endpoint: &TransportEndpoint,
    ) -> TranslatedCommand {
        let settings = &self.settings;
        let config = &invocation.config;
        TranslatedCommand::builder(&settings.server_executable)
            .arg_if(config.debug, "--verbose")
            .arg_if(config.foreground, "--foreground")
            .arg_if(config.read_only, "--read-only")
            .arg(format!("--filter={}", settings.exit_filter))
            .arg("--unix")
            .arg(endpoint.to_string())
            .args(invocation.extra_flags.iter().cloned())
            .arg(&settings.plugin_name)
            .args(
                invocation
                    .plugin_params
                    .iter()
                    .map(|(name, value)| format!("{}{name}={value}", settings.param_prefix)),
            )
            .arg(format!("{}={}", settings.bucket_param, invocation.bucket))
            .args(invocation.extra_params.iter().cloned())
            .build()
    }

    /// Client argv attaching the device to the server's endpoint
    pub fn client_command(
        &self,
        invocation: &Invocation,
        endpoint: &TransportEndpoint,
    ) -> TranslatedCommand {
        TranslatedCommand::builder(&self.settings.client_executable)
            .arg("-unix")
            .arg(endpoint.to_string())
            .arg("-block-size")
            .arg(self.settings.client_block_size.to_string())
            .arg("-nofork")
            .arg_if(invocation.config.read_only, "-readonly")
            .arg(invocation.device.display().to_string())
            .build()
    }

    /// Client argv that detaches the device node
    pub fn disconnect_command(&self, invocation: &Invocation) -> TranslatedCommand {
        TranslatedCommand::builder(&self.settings.client_executable)
            .arg("-d")
            .arg(invocation.device.display().to_string())
            .build()
    }
}
