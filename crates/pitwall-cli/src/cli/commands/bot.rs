//! Bot command handler.

use anyhow::Result;
use pitwall_core::config::{Config, paths};
use pitwall_core::logging;
use tracing::info;

pub async fn run(config: Config) -> Result<()> {
    // Held until exit so buffered file logs are flushed.
    let _log_guard = logging::init(&config)?;

    let config_path = paths::config_path();
    if config_path.exists() {
        info!(path = %config_path.display(), "loaded config file");
    }
    pitwall_bot::run(config).await
}
