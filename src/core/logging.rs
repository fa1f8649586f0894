use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::{AppPaths, LogRotation, LoggingSettings};

const FALLBACK_DIRECTIVE: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Log to stdout and to a rolling file under the log dir.
///
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init(paths: &AppPaths, settings: &LoggingSettings) {
    let _ = std::fs::create_dir_all(&paths.log_dir);

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(paths, settings));
    let _ = LOG_GUARD.set(guard);

    let directive = filter_directive(settings, std::env::var("RUST_LOG").ok());
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| {
        eprintln!("Invalid log filter '{}', using '{}'", directive, FALLBACK_DIRECTIVE);
        EnvFilter::new(FALLBACK_DIRECTIVE)
    });

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
}

fn file_appender(paths: &AppPaths, settings: &LoggingSettings) -> RollingFileAppender {
    let dir = &paths.log_dir;
    let name = &settings.file_name;
    match settings.rotation {
        LogRotation::Daily => rolling::daily(dir, name),
        LogRotation::Hourly => rolling::hourly(dir, name),
        LogRotation::Never => rolling::never(dir, name),
    }
}

fn filter_directive(settings: &LoggingSettings, rust_log: Option<String>) -> String {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| settings.level.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_configured_level() {
        let settings = LoggingSettings {
            level: "warn".to_string(),
            ..LoggingSettings::default()
        };

        assert_eq!(filter_directive(&settings, None), "warn");
        assert_eq!(filter_directive(&settings, Some("  ".to_string())), "warn");
        assert_eq!(
            filter_directive(&settings, Some("kaanoon_rag=debug".to_string())),
            "kaanoon_rag=debug"
        );
    }

    #[test]
    fn never_rotation_writes_configured_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_root(dir.path());
        let settings = LoggingSettings {
            file_name: "rag.log".to_string(),
            rotation: LogRotation::Never,
            ..LoggingSettings::default()
        };

        drop(file_appender(&paths, &settings));

        assert!(paths.log_dir.join("rag.log").exists());
    }
}
