//! Attachment upload handlers.

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    routing::post,
};

use crate::error::AppError;
use crate::extract::{Json, Multipart};
use crate::services::storage::MAX_UPLOAD_BYTES;
use crate::services::{StoredFile, UploadFile};
use crate::state::AppState;

/// Multipart framing allowance on top of the file itself.
const BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Build the uploads router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload_to_bucket))
        .route("/api/templates/upload", post(upload_template_attachment))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

/// Store a file in the S3-compatible bucket.
async fn upload_to_bucket(
    State(state): State<AppState>,
    Multipart(multipart): Multipart,
) -> Result<Json<StoredFile>, AppError> {
    let uploader = state.s3()?;
    let file = read_file_field(multipart).await?;
    Ok(Json(uploader.upload(file).await?))
}

/// Store a template attachment through the upload API.
async fn upload_template_attachment(
    State(state): State<AppState>,
    Multipart(multipart): Multipart,
) -> Result<Json<StoredFile>, AppError> {
    let client = state.upload_api()?;
    let file = read_file_field(multipart).await?;
    Ok(Json(client.upload(file).await?))
}

/// Pull the `file` field out of a multipart body.
async fn read_file_field(
    mut multipart: axum::extract::Multipart,
) -> Result<UploadFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let file = UploadFile {
            file_name,
            content_type,
            bytes,
        };
        file.validate()?;
        return Ok(file);
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}
