//! Tracing setup: stderr plus a daily-rolling file under the state directory

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "autopilot.log";

/// Filter for the `-v` count; `RUST_LOG` wins when set.
pub fn filter_for(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize logging.
///
/// With a `logs_dir` the file layer always records at `info` or finer so a
/// run leaves a trace even at the default stderr verbosity. The returned
/// guard flushes buffered lines on drop and must live until exit.
pub fn init(verbose: u8, logs_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter_for(verbose));

    let Some(dir) = logs_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) else {
        tracing_subscriber::registry().with(stderr).init();
        return None;
    };

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter_for(verbose.max(1)));

    tracing_subscriber::registry().with(stderr).with(file).init();
    Some(guard)
}
