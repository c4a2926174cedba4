//! Prometheus metrics for the bracket server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener when
//! `METRICS_BIND` (or `--metrics-bind`) is set. Without an installed exporter
//! every recording function is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ffl_server::metrics;
//! use std::net::SocketAddr;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/brackets", 201);
//! # }
//! ```

use ffl_bracket::bracket::{ErrorKind, RoundOutcome};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` should be the route template, not the concrete URI, so bracket
/// IDs do not become label values.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

/// Increment brackets created counter.
pub fn brackets_created_total(competitors: usize) {
    metrics::counter!("brackets_created_total").increment(1);
    metrics::histogram!("bracket_field_size").record(competitors as f64);
}

/// Increment recorded scores counter.
pub fn scores_recorded_total() {
    metrics::counter!("scores_recorded_total").increment(1);
}

/// Record a closed round: matchups decided, upsets and tiebreaks by rule.
pub fn round_advanced(outcome: &RoundOutcome) {
    metrics::counter!("rounds_advanced_total",
        "final" => outcome.tournament_complete.to_string()
    )
    .increment(1);

    for result in &outcome.matchup_results {
        if result.is_upset {
            metrics::counter!("upsets_total").increment(1);
        }
        if let Some(tiebreak) = &result.tiebreak {
            metrics::counter!("tiebreaks_total", "rule" => tiebreak.rule.to_string())
                .increment(1);
        }
    }
}

/// Increment failed bracket operations counter.
pub fn bracket_errors_total(operation: &str, kind: ErrorKind) {
    metrics::counter!("bracket_errors_total",
        "operation" => operation.to_string(),
        "kind" => kind_label(kind)
    )
    .increment(1);
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Precondition => "precondition",
        ErrorKind::NotReady => "not_ready",
        ErrorKind::Data => "data",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Invariant => "invariant",
        ErrorKind::Storage => "storage",
    }
}
