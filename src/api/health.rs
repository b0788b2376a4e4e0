/// Health check endpoints for liveness and readiness probes
///
/// The service holds no storage of its own, so health is reported from the
/// in-process components: the capability cache, the directory concurrency
/// limiter and the mailer.
use crate::{context::AppContext, metrics};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    pub version: String,

    pub uptime_seconds: f64,

    /// Individual component checks
    pub checks: Vec<ComponentHealth>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,

    /// Status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn healthy(name: &str, details: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            status: "healthy".to_string(),
            error: None,
            details: Some(details),
        }
    }
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/health/detailed", get(health_detailed))
}

pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Liveness probe; responding at all means alive
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe
///
/// Not ready while the limiter is closed, which only happens during shutdown.
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if ctx.capability_resolver.limiter().is_closed() {
        tracing::warn!("readiness_probe_failed: directory limiter closed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Detailed health check with all component statuses
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();

    let checks = vec![
        check_capability_cache(&ctx).await,
        check_directory_limiter(&ctx),
        check_mailer(&ctx),
    ];

    let overall_status = determine_overall_status(&checks);

    let health = HealthStatus {
        status: overall_status.clone(),
        version: ctx.config.service.version.clone(),
        uptime_seconds: ctx.started_at.elapsed().as_secs_f64(),
        checks,
        message: if overall_status == "healthy" {
            None
        } else {
            Some("One or more components are not healthy".to_string())
        },
    };

    let status_code = match overall_status.as_str() {
        "unhealthy" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    tracing::info!(
        status = %overall_status,
        duration_ms = start.elapsed().as_millis(),
        "health_check_completed"
    );

    (status_code, Json(health))
}

async fn check_capability_cache(ctx: &AppContext) -> ComponentHealth {
    let cache = ctx.capability_resolver.cache();
    let entries = cache.len().await;
    metrics::CAPABILITY_CACHE_SIZE.set(entries as i64);

    ComponentHealth::healthy(
        "capability_cache",
        serde_json::json!({
            "entries": entries,
            "ttl_secs": cache.ttl().num_seconds(),
        }),
    )
}

/// Saturation is reported as degraded; the service still answers, just slower
fn check_directory_limiter(ctx: &AppContext) -> ComponentHealth {
    let limiter = ctx.capability_resolver.limiter();
    let details = serde_json::json!({
        "capacity": limiter.capacity(),
        "available": limiter.available(),
    });

    if limiter.is_closed() {
        return ComponentHealth {
            name: "directory_limiter".to_string(),
            status: "unhealthy".to_string(),
            error: Some("Limiter closed".to_string()),
            details: Some(details),
        };
    }

    if limiter.available() == 0 {
        return ComponentHealth {
            name: "directory_limiter".to_string(),
            status: "degraded".to_string(),
            error: Some("All directory slots in use".to_string()),
            details: Some(details),
        };
    }

    ComponentHealth::healthy("directory_limiter", details)
}

fn check_mailer(ctx: &AppContext) -> ComponentHealth {
    ComponentHealth::healthy(
        "mailer",
        serde_json::json!({ "configured": ctx.mailer.is_configured() }),
    )
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    let unhealthy_count = checks.iter().filter(|c| c.status == "unhealthy").count();
    let degraded_count = checks.iter().filter(|c| c.status == "degraded").count();

    if unhealthy_count > 0 {
        "unhealthy".to_string()
    } else if degraded_count > 0 {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}
