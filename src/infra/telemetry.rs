use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_DEDUP, METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED,
    METRIC_CACHE_MISS, METRIC_CACHE_RESET, METRIC_FETCH_ERROR, METRIC_FETCH_MS,
    METRIC_MUTATION_ERROR,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Reads answered from a fresh cache entry."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Reads that started a network fetch."
        );
        describe_counter!(
            METRIC_CACHE_DEDUP,
            Unit::Count,
            "Reads that joined an in-flight fetch for the same key."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATED,
            Unit::Count,
            "Cache entries reached by tag invalidation."
        );
        describe_counter!(
            METRIC_CACHE_RESET,
            Unit::Count,
            "Session-scoped cache entries reset on a session change."
        );
        describe_counter!(
            METRIC_CACHE_EVICT,
            Unit::Count,
            "Unused cache entries evicted by garbage collection."
        );
        describe_counter!(
            METRIC_FETCH_ERROR,
            Unit::Count,
            "Failed cache fetches, labelled by error kind."
        );
        describe_counter!(
            METRIC_MUTATION_ERROR,
            Unit::Count,
            "Failed mutations, labelled by error kind."
        );
        describe_histogram!(
            METRIC_FETCH_MS,
            Unit::Milliseconds,
            "Latency of cache fetches in milliseconds."
        );
    });
}
