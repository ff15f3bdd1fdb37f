//! Logging setup: stdout plus a daily rolling file in the platform data dir.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "gpustress.log";

/// Default directory for log files
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("gpustress").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".logs"))
}

/// Installs the global subscriber.
///
/// The returned guard must live until exit or buffered file output is lost.
pub fn init_logging(level: Option<&str>, log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let env_filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
    };

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(cfg!(debug_assertions));

    // File logging is best effort; an unwritable data dir only loses the file layer.
    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    let (file_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
    guard
}
