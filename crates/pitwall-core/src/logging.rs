//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over the configured level. When a log directory is
//! configured, events are also written to a daily rolling file.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "pitwall.log";

/// Builds the filter from `RUST_LOG`, falling back to `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// stops the file writer.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>> {
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level))
        .with(stderr)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back() {
        // Must not panic on garbage.
        let filter = env_filter("not a [valid filter");
        assert!(!filter.to_string().is_empty());
    }
}
