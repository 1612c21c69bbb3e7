use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all service metrics
const PREFIX: &str = "charm_ringtone";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 180.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Composition Metrics
    pub static ref COMPOSITIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_compositions_total"), "Compositions by duration mode"),
        &["mode"]
    ).expect("Failed to create compositions_total metric");

    pub static ref REFINEMENTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_refinements_total"), "Prompt refinements by outcome"),
        &["outcome"]
    ).expect("Failed to create refinements_total metric");

    pub static ref REFINEMENT_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_refinement_duration_seconds"),
            "LLM refinement call duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["provider"]
    ).expect("Failed to create refinement_duration_seconds metric");

    // Generation Metrics
    pub static ref GENERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_generations_total"), "Audio generations by outcome"),
        &["outcome"]
    ).expect("Failed to create generations_total metric");

    pub static ref GENERATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_generation_duration_seconds"),
            "Audio generation call duration in seconds"
        )
        .buckets(vec![1.0, 5.0, 10.0, 20.0, 40.0, 60.0, 120.0]),
        &["outcome"]
    ).expect("Failed to create generation_duration_seconds metric");

    // Usage Limiting Metrics
    pub static ref USAGE_DENIALS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_usage_denials_total"), "Requests denied by the usage limiter"),
        &["endpoint"]
    ).expect("Failed to create usage_denials_total metric");

    pub static ref USAGE_TRACKED_IDENTITIES: Gauge = Gauge::new(
        format!("{PREFIX}_usage_tracked_identities"),
        "Number of caller identities currently tracked by the usage limiter"
    ).expect("Failed to create usage_tracked_identities metric");

    // Knowledge Base Metrics
    pub static ref KNOWLEDGE_BASE_ITEMS_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_knowledge_base_items_total"), "Items in the knowledge base"),
        &["type"]
    ).expect("Failed to create knowledge_base_items_total metric");

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
    let _ = REGISTRY.register(Box::new(COMPOSITIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REFINEMENTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REFINEMENT_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(GENERATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(GENERATION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(USAGE_DENIALS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(USAGE_TRACKED_IDENTITIES.clone()));
    let _ = REGISTRY.register(Box::new(KNOWLEDGE_BASE_ITEMS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn init_knowledge_base_metrics(num_categories: usize, num_charms: usize) {
    KNOWLEDGE_BASE_ITEMS_TOTAL
        .with_label_values(&["category"])
        .set(num_categories as f64);
    KNOWLEDGE_BASE_ITEMS_TOTAL
        .with_label_values(&["charm"])
        .set(num_charms as f64);
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_composition(mode: &str) {
    COMPOSITIONS_TOTAL.with_label_values(&[mode]).inc();
}

/// Record a refinement outcome: `refined`, `fallback` or `disabled`.
pub fn record_refinement(outcome: &str) {
    REFINEMENTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_refinement_duration(provider: &str, duration: Duration) {
    REFINEMENT_DURATION_SECONDS
        .with_label_values(&[provider])
        .observe(duration.as_secs_f64());
}

/// Record an audio generation outcome
pub fn record_generation(outcome: &str, duration: Duration) {
    GENERATIONS_TOTAL.with_label_values(&[outcome]).inc();
    GENERATION_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
}

pub fn record_usage_denial(endpoint: &str) {
    USAGE_DENIALS_TOTAL.with_label_values(&[endpoint]).inc();
}

pub fn set_usage_tracked_identities(count: usize) {
    USAGE_TRACKED_IDENTITIES.set(count as f64);
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
