//! Logging setup and configuration

use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "xchain-arb-bot.log";
const OUTPUT_SUBDIRS: [&str; 3] = ["logs", "opportunities", "executions"];

/// Flushes the file writer when dropped; hold it until exit.
pub struct LoggingGuard {
    _file: WorkerGuard,
}

/// Human-readable console output plus hourly JSON-lines files under
/// `<output_dir>/logs`. `RUST_LOG` overrides the default `info` level.
pub fn setup_logging(output_dir: &Path) -> Result<LoggingGuard> {
    let appender = tracing_appender::rolling::hourly(output_dir.join("logs"), LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info"),
    };

    let console = fmt::layer().with_target(false).with_ansi(true);
    let file = fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_current_span(false)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(LoggingGuard { _file: guard })
}

pub fn setup_output_directories(output_dir: &Path) -> Result<()> {
    for sub in OUTPUT_SUBDIRS {
        fs::create_dir_all(output_dir.join(sub))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_directories_created() {
        let root = std::env::temp_dir().join(format!("xchain-logging-{}", uuid::Uuid::new_v4()));
        setup_output_directories(&root).unwrap();
        for sub in OUTPUT_SUBDIRS {
            assert!(root.join(sub).is_dir());
        }
        fs::remove_dir_all(&root).unwrap();
    }
}
