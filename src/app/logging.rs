//! Usage: tracing subscriber setup (env filter, stderr layer, optional daily rolling file).

use crate::infra::settings::{LoggingSettings, ENV_LOG};
use crate::shared::error::{AuthError, AuthResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "workhub-auth.log";

/// Keeps the non-blocking file writer alive; drop it last so buffered lines are flushed.
#[must_use = "dropping the guard stops the file writer"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    match std::env::var(ENV_LOG) {
        Ok(raw) if !raw.trim().is_empty() => {
            EnvFilter::try_new(raw.trim()).unwrap_or_else(|_| EnvFilter::new(&settings.filter))
        }
        _ => EnvFilter::try_new(&settings.filter)
            .unwrap_or_else(|_| EnvFilter::new(crate::infra::settings::DEFAULT_LOG_FILTER)),
    }
}

pub fn init(settings: &LoggingSettings) -> AuthResult<LoggingGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .boxed();

    let (file_layer, file_guard) = match settings.directory.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                AuthError::new("LOG_INIT", format!("failed to create log dir {dir}: {e}"))
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(settings))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AuthError::new("LOG_INIT", format!("tracing subscriber init failed: {e}")))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
