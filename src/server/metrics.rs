use crate::catalog_store::CatalogCounts;
use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all catalog server metrics
const PREFIX: &str = "music_catalog";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    pub static ref CATALOG_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_catalog_operations_total"), "Catalog operations by outcome"),
        &["operation", "outcome"]
    ).expect("Failed to create catalog_operations_total metric");

    pub static ref CATALOG_ITEMS_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_catalog_items_total"), "Rows per catalog table"),
        &["type"]
    ).expect("Failed to create catalog_items_total metric");
}

pub fn init_metrics() {
    // Ignore errors if already registered (tests call this repeatedly)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_OPERATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_ITEMS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn set_catalog_items(counts: &CatalogCounts) {
    for (label, value) in [
        ("track", counts.tracks),
        ("artist", counts.artists),
        ("album", counts.albums),
        ("genre", counts.genres),
        ("artist_link", counts.artist_links),
        ("album_link", counts.album_links),
    ] {
        CATALOG_ITEMS_TOTAL
            .with_label_values(&[label])
            .set(value as f64);
    }
}

pub fn record_catalog_operation(operation: &str, outcome: &str) {
    CATALOG_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Collapses ids out of a request path so label cardinality stays bounded.
pub fn route_label(path: &str) -> String {
    let mut label = String::new();
    // "/v1/<collection>/<id>/<sub>/<id>"
    for (position, segment) in path.trim_start_matches('/').split('/').enumerate() {
        label.push('/');
        if position >= 2 && position % 2 == 0 {
            label.push_str("{id}");
        } else {
            label.push_str(segment);
        }
    }
    label
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let route = route_label(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &route, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, &route])
        .observe(duration.as_secs_f64());
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
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
