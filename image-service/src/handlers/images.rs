use crate::startup::AppState;
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service_core::error::AppError;

/// Usage summary served at `/`.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to Image Generation API",
        "usage": "/generate-image/<description>",
        "example": "/generate-image/a%20beautiful%20landscape"
    }))
}

/// Generate an image from the path-decoded `description` and return it as PNG.
///
/// Undecodable paths are rejected with the JSON error envelope.
#[tracing::instrument(skip_all, fields(description))]
pub async fn generate_image(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(description) = path.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Rejected undecodable description");
        AppError::BadRequest(anyhow::anyhow!(rejection.body_text()))
    })?;
    tracing::Span::current().record("description", description.as_str());

    if description.trim().is_empty() {
        tracing::warn!("Rejected empty description");
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Description cannot be empty"
        )));
    }

    tracing::info!("Generating image");

    match state.generator.generate(&description).await {
        Ok(image) => {
            tracing::info!(bytes = image.data.len(), "Image generated successfully");
            Ok(([(header::CONTENT_TYPE, image.mime_type)], image.data).into_response())
        }
        Err(e) => {
            tracing::error!(error = %e, "Error generating image");
            Err(e.into())
        }
    }
}
