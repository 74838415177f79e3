use crate::error::WebhookError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<WebhookError>() {
            Some(WebhookError::Validation(_)) | Some(WebhookError::UnknownEventType(_)) => {
                StatusCode::BAD_REQUEST
            }
            Some(WebhookError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(WebhookError::QueueFull(_)) | Some(WebhookError::QueueClosed) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            match self.0.downcast_ref::<WebhookError>() {
                Some(err) if err.is_escalated() => {
                    tracing::error!(alert = "webhook_storage", "Application error: {:?}", self.0)
                }
                _ => tracing::error!("Application error: {:?}", self.0),
            }
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
