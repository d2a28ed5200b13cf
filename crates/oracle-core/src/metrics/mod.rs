//! Prometheus metrics for rounds, sources and validator votes.
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed. [`install_prometheus`] installs one process-wide;
//! the proxy server does this and serves the rendered output on `/metrics`.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{sync::OnceLock, time::Duration};

pub use metrics_exporter_prometheus::PrometheusHandle;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder once and returns its handle.
///
/// # Errors
///
/// Returns an error if another recorder was already installed by someone else.
pub fn install_prometheus() -> Result<PrometheusHandle, String> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("failed to install prometheus recorder: {e}"))?;
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Outcome label for `oracle_rounds_total`.
pub fn record_round(outcome: &'static str, flavor: &'static str, duration: Duration) {
    counter!("oracle_rounds_total", "outcome" => outcome, "flavor" => flavor).increment(1);
    histogram!("oracle_round_duration_seconds", "flavor" => flavor).record(duration.as_secs_f64());
}

pub fn record_source_failure(set: &str, source: &str, kind: &'static str) {
    counter!(
        "oracle_source_failures_total",
        "set" => set.to_string(),
        "source" => source.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_rotation_success(index: usize) {
    counter!("oracle_rotation_success_total", "key" => index.to_string()).increment(1);
}

pub fn record_votes(accepted: usize, rejected: usize) {
    counter!("oracle_validator_votes_total", "vote" => "accept").increment(accepted as u64);
    counter!("oracle_validator_votes_total", "vote" => "reject").increment(rejected as u64);
}

pub fn record_proxy_request(symbol: &str, outcome: &'static str) {
    counter!("oracle_proxy_requests_total", "symbol" => symbol.to_string(), "outcome" => outcome)
        .increment(1);
}
