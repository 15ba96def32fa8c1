//! JSON extractor whose rejections use the service's `{error}` body.

use axum::extract::FromRequest;

use crate::error::AppError;

/// Drop-in for `axum::Json` that turns malformed or mistyped bodies into a
/// 400 [`AppError::Validation`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Parse a body that may legitimately be empty; an empty body yields `T::default()`
pub fn optional_json<T>(body: &[u8]) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))
}
