use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_DIRECTIVE: &str = "comprobantes=info";

/// Console logging plus a daily-rotated JSON log file.
///
/// The log directory comes from `COMPROBANTES_LOG_DIR` (default `logs/`).
/// A `RUST_LOG` value takes precedence over the built-in crate-level
/// directive.
pub fn init_logging() {
    let log_dir =
        std::env::var("COMPROBANTES_LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
    let _ = fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, "comprobantes.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // The guard must outlive the process so buffered log lines flush
    std::mem::forget(guard);
}
