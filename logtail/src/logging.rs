//! Tracing setup for the service.
//!
//! Deployment log files are product output and are never affected by this
//! module. Tracing is operator diagnostics only, written to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "logtail=info,logtail_server=info,tower_http=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` env var. Falls back to [`DEFAULT_FILTER`] if unset or invalid.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=logtail=debug cargo run -p logtail-server
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
