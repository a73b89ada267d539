//! Process-wide logging and metric metadata.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::metrics::{METRIC_EVICTION_AGE_SECONDS, METRIC_OPERATIONS_TOTAL};

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Installs a global fmt subscriber filtered by `RUST_LOG` (default `info`)
/// and registers the cache metric descriptions.
///
/// # Errors
///
/// [`TelemetryError::Subscriber`] when a global subscriber is already set.
pub fn init() -> Result<(), TelemetryError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().compact().with_target(true))
        .try_init()
        .map_err(|err| TelemetryError::Subscriber(err.to_string()))
}

/// Describes the cache metrics to the installed recorder. Runs once per process.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_OPERATIONS_TOTAL,
            Unit::Count,
            "Cache operations by path, operation (add, hit, miss, evict, err) and eviction reason."
        );
        describe_histogram!(
            METRIC_EVICTION_AGE_SECONDS,
            Unit::Seconds,
            "Age of stored entries at the moment they were evicted."
        );
    });
}
