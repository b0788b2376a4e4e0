/// EHF capability endpoints
use crate::{
    capability::OrgId,
    error::{AppError, AppResult},
    AppContext,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Largest batch accepted in one request
pub const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityResponse {
    pub orgnr: String,
    pub ehf: bool,
    /// False when the directory could not be reached; `ehf` is then not authoritative
    pub confirmed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub org_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub results: HashMap<String, bool>,
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/ehf/:orgnr", get(get_capability))
        .route("/api/ehf", post(resolve_batch))
}

/// Resolve a single organization number
pub async fn get_capability(
    State(ctx): State<AppContext>,
    Path(orgnr): Path<String>,
) -> AppResult<Json<CapabilityResponse>> {
    let org_id = OrgId::new(&orgnr);
    if !org_id.is_numeric() {
        return Err(AppError::Validation(
            "Organization number must be numeric".to_string(),
        ));
    }

    let capability = ctx.capability_resolver.resolve(&org_id).await;

    Ok(Json(CapabilityResponse {
        orgnr: org_id.to_string(),
        ehf: capability.is_supported(),
        confirmed: capability.is_confirmed(),
    }))
}

/// Resolve many organization numbers in one request
pub async fn resolve_batch(
    State(ctx): State<AppContext>,
    Json(req): Json<BatchRequest>,
) -> AppResult<Json<BatchResponse>> {
    if req.org_ids.len() > MAX_BATCH_SIZE {
        return Err(AppError::Validation(format!(
            "Too many organization numbers (max {})",
            MAX_BATCH_SIZE
        )));
    }

    if let Some(bad) = req.org_ids.iter().find(|id| !OrgId::new(id).is_numeric()) {
        return Err(AppError::Validation(format!(
            "Invalid organization number: {}",
            bad
        )));
    }

    let batch = ctx
        .capability_resolver
        .resolve_many_within(&req.org_ids, ctx.batch_deadline())
        .await;

    Ok(Json(BatchResponse {
        results: batch.into_map(),
    }))
}
