//! Logging and tracing configuration
//!
//! The run log goes to stdout. The filter sits behind a reload layer so the
//! `LogLevel` field of a test document can change verbosity once the
//! document has been read. An optional log file mirrors the stream.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use super::{Error, Result};

const DEFAULT_DIRECTIVES: &str = "crud_e2e=info,warn";

/// Handle kept alive for the duration of the process
pub struct LoggingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    _file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    /// Switch this crate's log level, keeping dependencies at WARN
    pub fn set_level(&self, level: LevelFilter) -> Result<()> {
        let filter = EnvFilter::new(format!("crud_e2e={},warn", level));
        self.filter
            .reload(filter)
            .map_err(|e| Error::Internal(format!("Failed to change log level: {}", e)))
    }
}

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable until a
/// document asks for a specific level. Default level is INFO for this
/// crate, WARN for dependencies.
pub fn init_cli(log_file: Option<&Path>) -> Result<LoggingHandle> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let (filter, handle) = reload::Layer::new(filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .with(file_layer)
        .init();

    Ok(LoggingHandle {
        filter: handle,
        _file_guard: guard,
    })
}
