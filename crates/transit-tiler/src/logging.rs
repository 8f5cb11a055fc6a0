//! Logging setup for the command line tool.
//!
//! With the `profiling` feature, `profiling::scope!` markers in the library are
//! emitted as tracing spans and show up in the same subscriber.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global subscriber, defaulting to INFO when `RUST_LOG` is unset.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("debug,hyper_util=info,reqwest=info,rustls=info")
        } else {
            EnvFilter::new("info")
        }
    });

    let fmt_layer = fmt::layer().with_target(false).with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::debug!(
        "Logging initialized (profiling {})",
        if cfg!(feature = "profiling") { "enabled" } else { "disabled" }
    );
}
