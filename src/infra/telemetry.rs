use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
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

/// Register metric descriptions with the installed recorder. Safe to call
/// more than once.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "mondrian_view_cache_hit_total",
            Unit::Count,
            "Total number of pages served from the view cache."
        );
        describe_counter!(
            "mondrian_view_cache_miss_total",
            Unit::Count,
            "Total number of view cache misses that started a render."
        );
        describe_counter!(
            "mondrian_view_cache_join_total",
            Unit::Count,
            "Total number of view cache misses that joined an in-flight render."
        );
        describe_counter!(
            "mondrian_view_cache_render_failure_total",
            Unit::Count,
            "Total number of page renders that failed and were not stored."
        );
        describe_counter!(
            "mondrian_view_cache_evict_total",
            Unit::Count,
            "Total number of view cache evictions due to capacity."
        );
        describe_histogram!(
            "mondrian_view_render_ms",
            Unit::Milliseconds,
            "Page render latency on a cache miss in milliseconds."
        );
        describe_counter!(
            "mondrian_renderer_fallback_total",
            Unit::Count,
            "Total number of views mounted without server markup, by reason."
        );
        describe_histogram!(
            "mondrian_renderer_request_ms",
            Unit::Milliseconds,
            "Renderer round-trip latency in milliseconds."
        );
    });
}
