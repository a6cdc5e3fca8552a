//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;
use crate::domain::dispatch::DispatchOutcome;

static HEX_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[0-9a-fA-F]{16,}(/|$)").unwrap());
static NUMERIC_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_default_metrics();

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

fn register_default_metrics() {
    gauge!("dispatch_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record the result of an API key validation (`valid` or a rejection label)
pub fn record_api_key_validation(result: &str) {
    counter!("api_key_validations_total", "result" => result.to_string()).increment(1);
}

/// Record a finished dispatch batch
pub fn record_dispatch(outcome: &DispatchOutcome) {
    counter!("dispatch_requests_total", "status" => outcome.status().as_str()).increment(1);

    let failed = outcome.attempted().saturating_sub(outcome.delivered());

    counter!("dispatch_recipients_total", "result" => "delivered")
        .increment(outcome.delivered() as u64);
    counter!("dispatch_recipients_total", "result" => "failed").increment(failed as u64);
}

/// Sanitize URL path for metric labels (remove keys and IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let path = HEX_KEY_PATTERN.replace_all(path, "/{key}$1");
    let path = NUMERIC_ID_PATTERN.replace_all(&path, "/{id}$1");

    if path.len() > 50 {
        path.chars().take(50).collect()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dispatch::RecipientFailure;

    #[test]
    fn test_sanitize_path_api_key() {
        let path = "/admin/keys/9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
        assert_eq!(sanitize_path(path), "/admin/keys/{key}");
    }

    #[test]
    fn test_sanitize_path_numeric_id() {
        assert_eq!(sanitize_path("/api/users/123/orders"), "/api/users/{id}/orders");
    }

    #[test]
    fn test_sanitize_path_no_id() {
        assert_eq!(sanitize_path("/send-message"), "/send-message");
    }

    #[test]
    fn test_sanitize_path_truncates_long_paths() {
        let path = "/very/long/path/that/exceeds/the/maximum/allowed/length/for/metrics";
        assert!(sanitize_path(path).len() <= 50);
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        let outcome = DispatchOutcome::from_results(
            vec![RecipientFailure {
                index: 1,
                recipient: "4912".to_string(),
                error: "boom".to_string(),
            }],
            2,
            1,
            false,
        );

        record_dispatch(&outcome);
        record_api_key_validation("valid");
        record_http_request("GET", "/health", 200, Duration::from_millis(3));
    }
}
