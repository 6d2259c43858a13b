//! Process-wide tracing subscriber.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "ferrous_lifespan=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logger(format: LogFormat) -> Result<(), TryInitError> {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter())
            .with(layer.compact())
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter())
            .with(layer.json())
            .try_init(),
    }
}
