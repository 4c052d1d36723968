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

pub const METRIC_GENERATE_TOTAL: &str = "scrivano_generate_total";
pub const METRIC_GENERATE_ERRORS: &str = "scrivano_generate_errors_total";
pub const METRIC_RENDER_MS: &str = "scrivano_render_ms";
pub const METRIC_CLEANUP_FAILURES: &str = "scrivano_artifact_cleanup_failures_total";

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
            METRIC_GENERATE_TOTAL,
            Unit::Count,
            "Total number of successfully rendered generate requests."
        );
        describe_counter!(
            METRIC_GENERATE_ERRORS,
            Unit::Count,
            "Total number of failed generate requests, labelled by failure kind."
        );
        describe_histogram!(
            METRIC_RENDER_MS,
            Unit::Milliseconds,
            "External renderer latency in milliseconds."
        );
        describe_counter!(
            METRIC_CLEANUP_FAILURES,
            Unit::Count,
            "Total number of artifact spool cleanup failures."
        );
    });
}
