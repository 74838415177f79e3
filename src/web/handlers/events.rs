use crate::error::WebhookError;
use crate::services::catalog::{self, CatalogExport};
use crate::web::error::AppResult;
use crate::web::extractors::TenantAuth;
use crate::web::handlers::json_single;
use crate::web::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerRequest {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// GET /api/v1/events
pub async fn catalog() -> Json<CatalogExport> {
    Json(catalog::export())
}

/// POST /api/v1/events
pub async fn trigger(
    State(state): State<Arc<AppState>>,
    TenantAuth(tenant_id): TenantAuth,
    payload: Result<Json<TriggerRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = payload.map_err(|e| WebhookError::validation(e.body_text()))?;
    let data = match request.data {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    };

    let id = state.webhooks.trigger(&request.event, &tenant_id, data)?;
    Ok((
        StatusCode::ACCEPTED,
        json_single(serde_json::json!({ "id": id })),
    )
        .into_response())
}
