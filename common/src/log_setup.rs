use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_PREFIX: &str = "imaging_bridge";
const MAX_LOG_FILES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum LogSetupError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },
    #[error("Failed to create log directory '{path}': {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to create log file appender: {0}")]
    Appender(String),
    #[error("Logging already initialized")]
    AlreadyInitialized,
}

/// Installs the process-wide subscriber: console output plus a daily rolled
/// file under `log_dir`. `RUST_LOG` takes precedence over `base_level`.
///
/// Only the first successful call has an effect; later calls return
/// [`LogSetupError::AlreadyInitialized`].
pub fn setup_logging(base_level: &str, log_dir: impl AsRef<Path>) -> Result<(), LogSetupError> {
    if LOG_GUARD.get().is_some() {
        return Err(LogSetupError::AlreadyInitialized);
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .map_err(|e| LogSetupError::InvalidFilter {
            filter: base_level.to_string(),
            message: e.to_string(),
        })?;

    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir).map_err(|source| LogSetupError::LogDir {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .map_err(|e| LogSetupError::Appender(e.to_string()))?;

    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_writer = std::io::stdout.and(std::io::stderr.with_min_level(Level::WARN));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true)
        .with_writer(console_writer);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LogSetupError::AlreadyInitialized)?;

    // A concurrent initializer loses in try_init above, so the slot is free here.
    let _ = LOG_GUARD.set(guard);

    tracing::info!("Logging initialized at '{}'", log_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_reported() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let result = setup_logging("imaging=notalevel", dir.path());

        assert!(matches!(
            result,
            Err(LogSetupError::InvalidFilter { .. }) | Err(LogSetupError::AlreadyInitialized)
        ));
    }

    #[test]
    fn second_setup_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let _ = setup_logging("debug", dir.path());

        let result = setup_logging("debug", dir.path());
        assert!(matches!(result, Err(LogSetupError::AlreadyInitialized)));
    }
}
