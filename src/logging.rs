use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "wordsteacher.log";

/// Keeps the background file writer alive; dropping it flushes pending lines.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    /// Directory for daily rolling files; `None` logs to stdout only.
    pub file_dir: Option<String>,
}

impl LogSettings {
    pub fn from_env(filter: &str) -> Self {
        let enabled = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        let file_dir = enabled.then(|| {
            std::env::var("LOG_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "./logs".to_string())
        });

        Self {
            filter: filter.to_string(),
            file_dir,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let Some(log_dir) = settings.file_dir.as_deref() else {
        registry.init();
        return None;
    };

    if let Err(err) = std::fs::create_dir_all(log_dir) {
        registry.init();
        tracing::warn!(error = %err, log_dir, "file logging disabled");
        return None;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    registry.with(file_layer).init();
    Some(FileLogGuard { _guard: guard })
}
