//! Logging setup.
//!
//! Installs a `tracing` subscriber writing to stderr. The log level can be
//! controlled via the `RUST_LOG` environment variable.

use {
    anyhow::Result as AnyhowResult,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "musicbox=info,warn";

/// Builds the log filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes the logging system.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> AnyhowResult<()> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()?;

    info!("Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::EnvFilter;

    use crate::logging::DEFAULT_FILTER;

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::try_new(DEFAULT_FILTER).unwrap();
        assert!(filter.to_string().contains("musicbox=info"));
    }
}
