use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::level_filters::LevelFilter;
use tracing::trace;
use tracing_log::AsTrace;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

/// Logs to stderr at the requested verbosity, and everything to `trace` when given.
pub(crate) fn configure_tracing(trace: Option<PathBuf>, verbose: Verbosity<InfoLevel>) -> anyhow::Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(verbose.log_level_filter().as_trace());

    let trace_layer = match &trace {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Unable to create trace log. path: {:?}", path))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::TRACE),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(trace_layer)
        .try_init()?;

    if let Some(path) = trace {
        trace!("Tracing to file. path: {:?}", path);
    }

    Ok(())
}
