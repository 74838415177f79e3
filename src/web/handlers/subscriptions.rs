use crate::error::WebhookError;
use crate::models::{NewSubscription, SubscriptionPatch};
use crate::services::deliveries;
use crate::web::error::AppResult;
use crate::web::extractors::TenantAuth;
use crate::web::handlers::{json_envelope, json_single, paginate};
use crate::web::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use std::sync::Arc;

/// Fields a client may never set after creation.
const IMMUTABLE_FIELDS: [&str; 4] = ["secret", "tenantId", "id", "createdAt"];

#[derive(Deserialize)]
pub struct PaginationParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// POST /api/v1/subscriptions
pub async fn create(
    State(state): State<Arc<AppState>>,
    TenantAuth(tenant_id): TenantAuth,
    payload: Result<Json<NewSubscription>, JsonRejection>,
) -> AppResult<Response> {
    let Json(input) = payload.map_err(|e| WebhookError::validation(e.body_text()))?;
    let (subscription, secret) = state.subscriptions.create(&tenant_id, input)?;

    Ok((
        StatusCode::CREATED,
        json_single(subscription.to_view_with_secret(&secret)),
    )
        .into_response())
}

/// GET /api/v1/subscriptions
pub async fn list(
    State(state): State<Arc<AppState>>,
    TenantAuth(tenant_id): TenantAuth,
) -> AppResult<Response> {
    let views: Vec<_> = state
        .subscriptions
        .list_for_tenant(&tenant_id)?
        .iter()
        .map(|s| s.to_view())
        .collect();
    let total = views.len();
    Ok(json_envelope(views, total as i64, 1, total.max(1)).into_response())
}

/// GET /api/v1/subscriptions/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    TenantAuth(tenant_id): TenantAuth,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let subscription = state
        .subscriptions
        .get(&id, &tenant_id)?
        .ok_or(WebhookError::NotFound(id))?;
    Ok(json_single(subscription.to_view()).into_response())
}

/// PATCH /api/v1/subscriptions/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    TenantAuth(tenant_id): TenantAuth,
    Path(id): Path<String>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload.map_err(|e| WebhookError::validation(e.body_text()))?;

    if let Some(fields) = body.as_object() {
        if let Some(field) = IMMUTABLE_FIELDS.iter().find(|f| fields.contains_key(**f)) {
            return Err(WebhookError::validation(format!("'{}' cannot be changed", field)).into());
        }
    }

    let patch: SubscriptionPatch = serde_json::from_value(body)
        .map_err(|e| WebhookError::validation(format!("invalid update: {}", e)))?;
    if patch.is_empty() {
        return Err(WebhookError::validation("no updatable fields supplied").into());
    }

    let subscription = state.subscriptions.update(&id, &tenant_id, patch)?;
    Ok(json_single(subscription.to_view()).into_response())
}

/// DELETE /api/v1/subscriptions/:id
pub async fn delete(
    State(state): State<Arc<AppState>>,
    TenantAuth(tenant_id): TenantAuth,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.subscriptions.delete(&id, &tenant_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/subscriptions/:id/deliveries
///
/// History outlives the subscription, so a deleted subscription with
/// recorded attempts still answers.
pub async fn deliveries(
    State(state): State<Arc<AppState>>,
    TenantAuth(tenant_id): TenantAuth,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Response> {
    let api = &state.config.api;
    let (page, per_page, offset) = paginate(
        params.page,
        params.per_page,
        api.default_page_size,
        api.max_page_size,
    );

    let total = deliveries::count_for_subscription(&state.db, &tenant_id, &id)?;
    if total == 0 && state.subscriptions.get(&id, &tenant_id)?.is_none() {
        return Err(WebhookError::NotFound(id).into());
    }

    let rows = deliveries::list_for_subscription(&state.db, &tenant_id, &id, per_page, offset)?;
    Ok(json_envelope(rows, total, page, per_page).into_response())
}
