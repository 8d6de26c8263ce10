//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Installs a global `tracing` subscriber.
///
/// The level comes from `RUST_LOG` and defaults to `info`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
