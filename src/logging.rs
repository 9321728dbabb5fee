//! Logging initialization.
//!
//! Configures `tracing-subscriber` from the `log_level` and `log_format`
//! settings. Log lines go to stderr so stdout carries only scan output.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Formats
///
/// * `"text"` - Human-readable single-line output
/// * `"json"` - Machine-parseable JSON lines
pub fn init_tracing(config: &Config) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e))?;
        }
        "text" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))?;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'text' or 'json'",
                config.log_format
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_is_rejected() {
        let config = Config {
            log_format: "xml".to_string(),
            ..Config::default()
        };
        assert!(init_tracing(&config).is_err());
    }
}
