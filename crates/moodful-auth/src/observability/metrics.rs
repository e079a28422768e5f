//! Prometheus metrics for moodful-auth

use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

// Server metrics
const METRIC_UPTIME: &str = "moodful_auth_uptime_seconds";
const METRIC_INFO: &str = "moodful_auth_info";

// Authentication metrics
const METRIC_VERDICTS: &str = "moodful_auth_verdicts_total";
const METRIC_REJECTIONS: &str = "moodful_auth_token_rejections_total";
const METRIC_KEY_ROTATION_RETRIES: &str = "moodful_auth_key_rotation_retries_total";
const METRIC_DEBUG_BYPASSES: &str = "moodful_auth_debug_bypasses_total";

// Provider metrics
const METRIC_DISCOVERY_FETCHES: &str = "moodful_auth_discovery_fetches_total";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();
    START_TIME.set(Instant::now()).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_gauge!(METRIC_UPTIME, "Server uptime in seconds");
    describe_gauge!(METRIC_INFO, "Server information (always 1)");

    describe_counter!(METRIC_VERDICTS, "Authentication verdicts by outcome");
    describe_counter!(METRIC_REJECTIONS, "Rejected bearer tokens by reason");
    describe_counter!(
        METRIC_KEY_ROTATION_RETRIES,
        "Validations retried after an unknown signing key"
    );
    describe_counter!(
        METRIC_DEBUG_BYPASSES,
        "Requests let through by authentication debug mode"
    );
    describe_counter!(
        METRIC_DISCOVERY_FETCHES,
        "Provider configuration fetches by status"
    );

    gauge!(
        METRIC_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    if let Some(start) = START_TIME.get() {
        gauge!(METRIC_UPTIME).set(start.elapsed().as_secs_f64());
    }

    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record an authentication verdict.
pub fn record_verdict(verdict: &str) {
    counter!(METRIC_VERDICTS, "verdict" => verdict.to_owned()).increment(1);
}

/// Record a rejected token.
pub fn record_rejection(reason: &str) {
    counter!(METRIC_REJECTIONS, "reason" => reason.to_owned()).increment(1);
}

/// Record a refresh-and-retry caused by an unknown signing key.
pub fn record_key_rotation_retry() {
    counter!(METRIC_KEY_ROTATION_RETRIES).increment(1);
}

/// Record a request authenticated by debug mode.
pub fn record_debug_bypass() {
    counter!(METRIC_DEBUG_BYPASSES).increment(1);
}

/// Record a provider configuration fetch.
pub fn record_discovery_fetch(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(METRIC_DISCOVERY_FETCHES, "status" => status.to_owned()).increment(1);
}
