use anyhow::{anyhow, Result};
use orgroute_core::config::{LogFormat, LoggingConfig};
use tracing::Level;

/// Install the global subscriber. Events go to stderr so stdout stays a single JSON payload.
pub fn init(logging: &LoggingConfig) -> Result<()> {
    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!("failed to install tracing subscriber: {error}"))
}
