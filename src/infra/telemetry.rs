use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metric_names::{
    METRIC_CACHE_BACKEND_ERRORS, METRIC_CACHE_CONSUME_MS, METRIC_CACHE_EVICTIONS,
    METRIC_CACHE_HITS, METRIC_CACHE_MISSES, METRIC_DEAD_LETTERS, METRIC_INVALIDATION_RETRIES,
    METRIC_KEYS_INVALIDATED, METRIC_QUEUE_LENGTH, METRIC_QUEUE_OVERFLOWS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HITS,
            Unit::Count,
            "Total number of cache-aside reads answered from the cache."
        );
        describe_counter!(
            METRIC_CACHE_MISSES,
            Unit::Count,
            "Total number of cache-aside reads that fell back to the store of record."
        );
        describe_counter!(
            METRIC_CACHE_EVICTIONS,
            Unit::Count,
            "Total number of in-process cache evictions due to capacity."
        );
        describe_counter!(
            METRIC_CACHE_BACKEND_ERRORS,
            Unit::Count,
            "Total number of failed or timed-out cache backend calls."
        );
        describe_gauge!(
            METRIC_QUEUE_LENGTH,
            Unit::Count,
            "Current number of pending invalidation events."
        );
        describe_counter!(
            METRIC_QUEUE_OVERFLOWS,
            Unit::Count,
            "Total number of times the invalidation queue collapsed into a flush."
        );
        describe_counter!(
            METRIC_INVALIDATION_RETRIES,
            Unit::Count,
            "Total number of invalidation events re-queued after a failed apply."
        );
        describe_counter!(
            METRIC_DEAD_LETTERS,
            Unit::Count,
            "Total number of invalidation events moved to the dead-letter log."
        );
        describe_counter!(
            METRIC_KEYS_INVALIDATED,
            Unit::Count,
            "Total number of cache keys removed by invalidation."
        );
        describe_histogram!(
            METRIC_CACHE_CONSUME_MS,
            Unit::Milliseconds,
            "Invalidation batch consumption latency in milliseconds."
        );
    });
}
