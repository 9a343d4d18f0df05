//! Tracing setup for the binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "congresso_warehouse=info,warehouse_core=info,warehouse_postgres=info";

/// Install the global subscriber. `RUST_LOG` overrides [`DEFAULT_FILTER`].
/// Calling it twice is a no-op.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
