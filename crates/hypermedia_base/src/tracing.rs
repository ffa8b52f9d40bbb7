use crate::error::{HypermediaError, HypermediaResult};
pub use tracing::instrument;
pub use tracing::{debug, error, info, trace, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber: env-filtered fmt output plus span trace capture for errors.
///
/// The filter is read from `RUST_LOG` and defaults to `info`.
pub fn init_tracing() -> HypermediaResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| {
            Box::new(HypermediaError::message(format!(
                "failed to install tracing subscriber: {}",
                e
            )))
        })
}
