//! Logging setup
//!
//! Diagnostics go to stderr through `tracing`; `RUST_LOG` overrides the
//! level picked from `-q` / `-v`.

use crate::cli::args::Verbosity;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter for a verbosity level, honoring `RUST_LOG`
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()))
}

/// Install the global subscriber
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init(verbosity: Verbosity) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
