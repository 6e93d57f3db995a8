use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use service_core::error::{AppError, ErrorResponse};
use std::any::Any;

/// Fallback for any path without a route.
pub async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Endpoint not found"))
}

/// Converts a panic escaping a handler into the generic 500 envelope.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail: &str = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };

    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error")),
    )
        .into_response()
}
