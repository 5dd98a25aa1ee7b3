use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all widget metrics
const PREFIX: &str = "now_playing";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Render Metrics
    pub static ref RENDERS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_renders_total"), "Widget renders by outcome"),
        &["outcome"]
    ).expect("Failed to create renders_total metric");

    pub static ref RENDER_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_render_duration_seconds"),
            "Time to resolve a track and render the widget"
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["provider"]
    ).expect("Failed to create render_duration_seconds metric");

    pub static ref PALETTE_SOURCE_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_palette_source_total"), "Which artwork fallback level produced the palette"),
        &["source"]
    ).expect("Failed to create palette_source_total metric");

    // Provider Metrics
    pub static ref PROVIDER_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_provider_requests_total"), "Upstream provider API calls by status"),
        &["provider", "status"]
    ).expect("Failed to create provider_requests_total metric");

    // Process Metrics
    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(RENDERS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RENDER_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PALETTE_SOURCE_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROVIDER_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method])
        .observe(duration.as_secs_f64());
}

/// Record a finished render; `outcome` is "ok" or an error kind.
pub fn record_render(provider: &str, outcome: &str, duration: Duration) {
    RENDERS_TOTAL.with_label_values(&[outcome]).inc();
    RENDER_DURATION_SECONDS
        .with_label_values(&[provider])
        .observe(duration.as_secs_f64());
}

pub fn record_palette_source(source: &str) {
    PALETTE_SOURCE_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_provider_request(provider: &str, status: &str) {
    PROVIDER_REQUESTS_TOTAL
        .with_label_values(&[provider, status])
        .inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_metric(name: &str) -> bool {
        REGISTRY.gather().iter().any(|m| m.get_name() == name)
    }

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        init_metrics();

        let metric_families = REGISTRY.gather();
        assert!(!metric_families.is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_http_request() {
        init_metrics();

        record_http_request("GET", 200, Duration::from_millis(50));

        assert!(has_metric("now_playing_http_requests_total"));
        assert!(has_metric("now_playing_http_request_duration_seconds"));
    }

    #[test]
    fn test_record_render_and_palette_source() {
        init_metrics();

        record_render("Spotify", "ok", Duration::from_millis(300));
        record_palette_source("artwork");

        assert!(has_metric("now_playing_renders_total"));
        assert!(has_metric("now_playing_palette_source_total"));
        let count = RENDERS_TOTAL.with_label_values(&["ok"]).get();
        assert!(count >= 1.0);
    }

    #[test]
    fn test_record_provider_request() {
        init_metrics();

        record_provider_request("lastfm", "200");

        assert!(has_metric("now_playing_provider_requests_total"));
    }
}
