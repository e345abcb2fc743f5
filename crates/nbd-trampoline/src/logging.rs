use tracing::warn;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, reload};

type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type BoxedSink = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Handle on the process-wide subscriber.
///
/// Both the level filter and the output sink can be swapped after start-up:
/// the filter once the command line says whether to debug, the sink when the
/// process detaches from its terminal.
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    sink: reload::Handle<BoxedSink, FilteredRegistry>,
}

impl LogHandle {
    /// Install a stderr subscriber filtered by `RUST_LOG`, or `info` without it.
    ///
    /// If a global subscriber is already set the handle still works, but its
    /// reloads have no effect.
    pub fn init() -> Self {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let (filter, filter_handle) = reload::Layer::new(filter);
        let (sink, sink_handle) = reload::Layer::new(stderr_sink());

        let _ = tracing_subscriber::registry().with(filter).with(sink).try_init();

        Self {
            filter: filter_handle,
            sink: sink_handle,
        }
    }

    /// Raise the level to `debug` unless `RUST_LOG` already decides it
    pub fn set_debug(&self, debug: bool) {
        if !debug || std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            return;
        }
        if let Err(e) = self.filter.reload(EnvFilter::new("debug")) {
            warn!("failed to raise log level: {e}");
        }
    }

    /// Route further output to the systemd journal.
    ///
    /// Stays on stderr when journald is unreachable.
    pub fn switch_to_journald(&self) {
        match tracing_journald::layer() {
            Ok(journald) => {
                let sink: BoxedSink = Box::new(journald);
                if let Err(e) = self.sink.reload(sink) {
                    warn!("failed to switch log sink: {e}");
                }
            }
            Err(e) => warn!("journald unavailable, keeping stderr: {e}"),
        }
    }
}

fn stderr_sink() -> BoxedSink {
    Box::new(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false),
    )
}
