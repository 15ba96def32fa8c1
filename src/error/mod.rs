use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::notification::DeliveryError;
use crate::scheduler::ScheduleError;

#[derive(Error, Debug)]
pub enum AppError {
    /// Bad or missing request fields; nothing was mutated
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// A delivery round failed outside per-recipient handling
    #[error("Failed to send notifications")]
    Delivery(#[source] DeliveryError),
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::Delivery(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Error body shared by every endpoint: `{"error": "..."}`
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Schedule(_) => StatusCode::BAD_REQUEST,
            AppError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (client_message, log_message) = match &self {
            AppError::Validation(msg) => (msg.clone(), msg.clone()),
            AppError::Schedule(e) => (e.to_string(), e.to_string()),
            // Client sees the generic message; the cause is only logged
            AppError::Delivery(e) => (self.to_string(), e.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(status = %status.as_u16(), message = %log_message, "API error");
        } else {
            tracing::warn!(status = %status.as_u16(), message = %log_message, "Rejected request");
        }

        (
            status,
            Json(ErrorResponse {
                error: client_message,
            }),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = AppError::Validation("notifications must be an array".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "notifications must be an array");
    }

    #[test]
    fn test_schedule_error_maps_to_bad_request() {
        let err = AppError::from(ScheduleError::NotInFuture);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Scheduled time must be in the future");
    }

    #[test]
    fn test_delivery_error_hides_details() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AppError::from(DeliveryError::Serialization(source));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to send notifications");
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = AppError::Validation("Invalid subscription".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Invalid subscription" }));
    }
}
