//! Logging initialization using the `tracing` ecosystem.
//!
//! Console output is always on. With a log directory, a second layer writes
//! daily-rotating files named after the module, either as plain text or as
//! one JSON object per line. `RUST_LOG` overrides the requested level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File log encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileFormat {
    #[default]
    Text,
    /// Newline-delimited JSON, one event per line.
    Json,
}

/// Where and how to log.
#[derive(Debug, Clone)]
pub struct LogOptions<'a> {
    /// Default level if `RUST_LOG` is not set (e.g. `"info"`).
    pub level: &'a str,
    /// Directory for daily-rotating log files; console only when `None`.
    pub dir: Option<&'a str>,
    /// Log file prefix (e.g. `"rit_algo"`).
    pub module_name: &'a str,
    pub file_format: FileFormat,
}

/// Initialize the global tracing subscriber. Call once at program start.
///
/// Returns the file writer's guard; keep it alive until exit so buffered
/// lines are flushed.
pub fn init_logging(opts: &LogOptions<'_>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(opts.level));
    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    let Some(dir) = opts.dir else {
        tracing_subscriber::registry().with(env_filter).with(console_layer).init();
        return None;
    };

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, opts.module_name));
    let file_layer = match opts.file_format {
        FileFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).with_target(true).boxed(),
        FileFormat::Json => fmt::layer().json().with_writer(writer).with_current_span(false).boxed(),
    };

    tracing_subscriber::registry().with(env_filter).with(console_layer).with(file_layer).init();
    Some(guard)
}
