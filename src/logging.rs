use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::{LoanError, Result};

/// Install a global tracing subscriber for applications embedding the book.
///
/// `RUST_LOG` wins over `log_level` when set. Fails if a global subscriber is
/// already installed.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| LoanError::Configuration {
            message: format!("tracing subscriber: {}", e),
        })
}
