//! Tracing subscriber setup
//!
//! Logs go to stderr so they never interleave with the interactive output
//! on stdout. The level is controlled through `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "r_lessonaudio=info,warn";

/// Builds the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system.
///
/// With `json` set, events are emitted as one JSON object per line.
/// Fails if a global subscriber is already installed.
pub fn init_logging(json: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter());

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init()?;
    }

    tracing::debug!("Logging initialized.");
    Ok(())
}
