//! Logging setup

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the log filter; `RUST_LOG` wins over the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(env.as_deref(), &config.level)
}

/// Invalid directives fall through to the next source, then to `info`
fn filter_from(env: Option<&str>, level: &str) -> EnvFilter {
    env.ok_or(())
        .and_then(|directives| EnvFilter::try_new(directives).map_err(|_| ()))
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber
pub fn init(config: &LoggingConfig) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(filter: EnvFilter) -> String {
        filter.to_string().to_lowercase()
    }

    #[test]
    fn test_configured_level_is_used() {
        assert_eq!(directives(filter_from(None, "debug")), "debug");
    }

    #[test]
    fn test_invalid_level_falls_back() {
        assert_eq!(directives(filter_from(None, "plejd=verbose")), "info");
    }

    #[test]
    fn test_env_directives_win() {
        assert_eq!(
            directives(filter_from(Some("plejd_core=trace"), "warn")),
            "plejd_core=trace"
        );
        assert_eq!(directives(filter_from(Some("plejd=verbose"), "warn")), "warn");
    }
}
