use nbd_trampoline::{LogHandle, USAGE, load_settings, run_trampoline};
use std::process::ExitCode;
use tracing::{debug, error};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let options = args.iter().take_while(|arg| arg.starts_with('-') && *arg != "--");
    for arg in options {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            "--version" => {
                println!("nbd-trampoline {}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            _ => {}
        }
    }

    let logging = LogHandle::init();
    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run_trampoline(&args, settings, &logging) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            let code = e.exit_code();
            debug!("run failed with code {code}");
            if e.is_usage_error() {
                // Usage errors are reported as plain failures once the text is shown
                eprint!("{USAGE}");
                return ExitCode::FAILURE;
            }
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
