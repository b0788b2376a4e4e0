/// Metrics and telemetry for FirmaSøk
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Capability cache hit/miss rates
/// - Directory query outcomes, retries and concurrency
/// - Registry lookups
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder,
    Gauge, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // ========== Cache Metrics ==========

    /// Cache hits by cache type
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_hits_total",
        "Total number of cache hits",
        &["cache_type"]
    )
    .unwrap();

    /// Cache misses by cache type
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_misses_total",
        "Total number of cache misses",
        &["cache_type"]
    )
    .unwrap();

    /// Entries physically held by the capability cache
    pub static ref CAPABILITY_CACHE_SIZE: IntGauge = register_int_gauge!(
        "capability_cache_size",
        "Number of entries in the capability cache"
    )
    .unwrap();

    // ========== Directory Metrics ==========

    /// Directory queries by outcome
    pub static ref DIRECTORY_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "directory_queries_total",
        "Total number of Peppol directory queries",
        &["outcome"]
    )
    .unwrap();

    /// Directory query duration in seconds
    pub static ref DIRECTORY_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "directory_query_duration_seconds",
        "Peppol directory query latencies in seconds",
        &["outcome"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Retries scheduled by reason
    pub static ref DIRECTORY_RETRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "directory_retries_total",
        "Total number of directory query retries",
        &["reason"]
    )
    .unwrap();

    /// Directory queries holding a limiter slot
    pub static ref DIRECTORY_QUERIES_IN_FLIGHT: IntGauge = register_int_gauge!(
        "directory_queries_in_flight",
        "Number of directory lookups currently holding a concurrency slot"
    )
    .unwrap();

    /// Capability resolutions by final status
    pub static ref CAPABILITY_RESOLUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "capability_resolutions_total",
        "Total number of capability resolutions that reached the directory",
        &["status"]
    )
    .unwrap();

    // ========== Registry Metrics ==========

    /// Registry requests by operation and status
    pub static ref REGISTRY_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "registry_requests_total",
        "Total number of Enhetsregisteret requests",
        &["operation", "status"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a cache access
pub fn record_cache_access(cache_type: &str, hit: bool) {
    if hit {
        CACHE_HITS_TOTAL.with_label_values(&[cache_type]).inc();
    } else {
        CACHE_MISSES_TOTAL.with_label_values(&[cache_type]).inc();
    }
}

/// Record one directory query
pub fn record_directory_query(outcome: &str, duration: f64) {
    DIRECTORY_QUERIES_TOTAL.with_label_values(&[outcome]).inc();
    DIRECTORY_QUERY_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration);
}

/// Record a scheduled retry
pub fn record_directory_retry(reason: &str) {
    DIRECTORY_RETRIES_TOTAL.with_label_values(&[reason]).inc();
}

/// Record the final status of a resolution
pub fn record_capability_resolution(status: &str) {
    CAPABILITY_RESOLUTIONS_TOTAL
        .with_label_values(&[status])
        .inc();
}

/// Record a registry request
pub fn record_registry_request(operation: &str, success: bool) {
    REGISTRY_REQUESTS_TOTAL
        .with_label_values(&[operation, if success { "success" } else { "failure" }])
        .inc();
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}
