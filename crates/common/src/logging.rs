//! Logging and tracing initialization.

use std::fs::OpenOptions;
use std::sync::Mutex;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// Logs go to stderr so they never interleave with progress lines on stdout,
/// or to `config.file` (appended) when one is set.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let log_file = config.file.as_ref().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Cannot open log file {}: {e}", path.display()))
            .ok()
    });

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let installed = match (config.json, log_file) {
        (true, Some(file)) => tracing::subscriber::set_global_default(
            builder.json().with_writer(Mutex::new(file)).finish(),
        ),
        (true, None) => tracing::subscriber::set_global_default(
            builder.json().with_writer(std::io::stderr).finish(),
        ),
        (false, Some(file)) => tracing::subscriber::set_global_default(
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish(),
        ),
        (false, None) => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stderr).finish(),
        ),
    };
    installed.ok();
}
