//! Connects an S3 bucket to a network block device.
//!
//! `nbd-trampoline` starts `nbdkit` with the s3backer plugin on a private
//! Unix socket, attaches the device to it with `nbd-client`, and stays around
//! to tear both down again: when the server goes away or when it is asked to
//! stop with SIGHUP, SIGINT, SIGQUIT or SIGTERM.

#[cfg(not(unix))]
compile_error!("nbd-trampoline only supports Unix platforms");

mod background;
mod factory;
mod logging;

pub use background::Daemonizer;
pub use factory::PlatformFactory;
pub use logging::LogHandle;

// Re-export core functionality
pub use nbd_trampoline_core::*;

use anyhow::Context;
use tracing::debug;

/// Environment variable naming a JSON settings file
pub const SETTINGS_ENV: &str = "NBD_TRAMPOLINE_SETTINGS";

pub const USAGE: &str = "\
Usage:
    nbd-trampoline [--nbd] [options] [--] bucket device

NBD options:
    --nbd                  Accepted for compatibility with s3backer
    --nbd-flag=FLAG        Pass FLAG to nbdkit
    --nbd-param=NAME=VALUE Pass NAME=VALUE to the s3backer plugin

Other options:
    -d, --debug            Log debug output and stay in the foreground
    -f                     Stay in the foreground
    --readOnly             Attach the device read-only
    --NAME[=VALUE]         Any other s3backer flag, forwarded to the plugin
    -h, --help             Show this help
    --version              Show the version
";

/// Settings from [`SETTINGS_ENV`] when set, otherwise the built-in defaults
pub fn load_settings() -> anyhow::Result<TrampolineSettings> {
    match std::env::var_os(SETTINGS_ENV) {
        Some(path) => TrampolineSettings::load(&path)
            .with_context(|| format!("{SETTINGS_ENV}={}", path.to_string_lossy())),
        None => Ok(TrampolineSettings::default()),
    }
}

/// Translate `raw` and keep bucket and device connected until shutdown.
///
/// Nothing is spawned unless the settings and command line are valid and the
/// endpoint for the device could be prepared. Termination signals are caught from here on.
pub fn run_trampoline<S: AsRef<str>>(
    raw: &[S],
    settings: TrampolineSettings,
    logging: &LogHandle,
) -> Result<(), TrampolineError> {
    settings.validate()?;
    let translator = ArgumentTranslator::new(settings);
    let invocation = translator.translate(raw)?;
    logging.set_debug(invocation.config.debug);
    debug!(
        "running on {} with {:?}",
        PlatformFactory::platform_name(),
        invocation.config
    );

    let endpoint = PlatformFactory::endpoint_resolver(&translator.settings().socket_dir)
        .resolve(&invocation.device)?;
    debug!("using endpoint {endpoint}");

    let signals = PlatformFactory::install_signal_bridge()?;
    let control = PlatformFactory::create_process_control();
    let mut trampoline = Trampoline::new(translator, control, signals);

    if invocation.config.foreground {
        trampoline.run(&invocation, &endpoint, &mut StayInForeground)
    } else {
        trampoline.run(&invocation, &endpoint, &mut Daemonizer::new(logging.clone()))
    }
}
