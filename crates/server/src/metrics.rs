//! Prometheus recorder and the `/metrics` handler

use axum::{http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

const LATENCY_BUCKETS: [f64; 10] = [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the global recorder. Safe to call more than once; later calls
/// return the existing handle.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if let Some(handle) = HANDLE.get() {
        return Some(handle.clone());
    }

    let builder = match PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), &LATENCY_BUCKETS)
    {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid histogram buckets, using defaults");
            PrometheusBuilder::new()
        },
    };

    match builder.install_recorder() {
        Ok(handle) => {
            let _ = HANDLE.set(handle.clone());
            Some(handle)
        },
        Err(e) => {
            tracing::warn!(error = %e, "Metrics recorder not installed");
            None
        },
    }
}

pub async fn metrics_handler() -> impl IntoResponse {
    match HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics disabled\n".to_string()),
    }
}

pub fn record_request(route: &'static str, status: u16) {
    metrics::counter!("receptionist_http_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}

pub fn record_turn_timeout() {
    metrics::counter!("receptionist_turn_timeouts_total").increment(1);
}
