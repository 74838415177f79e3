use crate::services::api_keys;
use crate::web::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The tenant resolved from an `Authorization: Bearer <key>` header.
pub struct TenantAuth(pub String);

fn unauthorized() -> Response {
    let body = serde_json::json!({
        "error": "Unauthorized",
        "message": "A valid tenant API key is required",
    });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

impl FromRequestParts<Arc<AppState>> for TenantAuth {
    type Rejection = Response;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let state = state.clone();
        let bearer = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .map(|Authorization(bearer)| bearer.token().to_string());
        Box::pin(async move {
            let raw_key = bearer.ok_or_else(unauthorized)?;

            let key = api_keys::authenticate(&state.db, &raw_key)
                .map_err(|e| {
                    tracing::error!("API key lookup failed: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                })?
                .ok_or_else(unauthorized)?;

            Ok(TenantAuth(key.tenant_id))
        })
    }
}
