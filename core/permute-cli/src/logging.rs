//! Tracing setup: a daily-rolled file under `~/.permute/logs/` plus warnings on stderr.
//!
//! Filter precedence: `PERMUTE_DEBUG_LOG=1` forces `debug`, else `PERMUTE_LOG`,
//! else `RUST_LOG`, else `info`.

use std::env;

use permute_core::StorageConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "permute";
const LOG_FILE_SUFFIX: &str = "log";

/// Installs the global subscriber. Keep the guard alive until exit so buffered
/// lines reach the file.
pub fn init(storage: &StorageConfig) -> Option<WorkerGuard> {
    let appender = storage.ensure_dirs().ok().and_then(|()| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix(LOG_FILE_SUFFIX)
            .build(storage.logs_dir())
            .ok()
    });

    match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(build_filter());
            tracing_subscriber::registry()
                .with(file_layer)
                .with(stderr_layer())
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer()).init();
            tracing::warn!(dir = %storage.logs_dir().display(), "File logging unavailable");
            None
        }
    }
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN)
}

fn build_filter() -> EnvFilter {
    if debug_forced() {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_env("PERMUTE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn debug_forced() -> bool {
    env::var("PERMUTE_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}
