//! Diagnostics go to stderr through `tracing`; stdout carries only harness
//! output (hex rows, bulk keystream, JSON reports).

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins; otherwise the crate logs
/// at `info`, or `debug` when `verbose`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), TryInitError> {
    let default = if verbose {
        "shannon_harness=debug,shn_harness=debug"
    } else {
        "shannon_harness=info,shn_harness=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
}
