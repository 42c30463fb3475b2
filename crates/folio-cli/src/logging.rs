//! Tracing subscriber setup

use crate::settings::FolioSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter from `RUST_LOG`, else `fallback`
///
/// An unparsable fallback degrades to `warn`.
#[must_use]
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber
///
/// Logs go to stderr so command output on stdout stays parseable. `verbose`
/// overrides the configured filter with `folio=debug`.
///
/// # Errors
/// Returns error if a global subscriber is already installed
pub fn init(settings: &FolioSettings, verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("folio=debug")
    } else {
        env_filter(&settings.log_filter)
    };

    let layer = if settings.json_logs {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}
