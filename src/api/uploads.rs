//! Multipart image upload shared by complaints and businesses.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::server::{AppState, CurrentUser};
use crate::uploads::UploadError;

/// Multipart field carrying the image
const IMAGE_FIELD: &str = "image";

/// POST /api/complaints/upload, POST /api/businesses/upload
#[tracing::instrument(name = "uploads.image", skip_all, fields(user_id = %current.id()))]
pub async fn upload_image(
    State(state): State<AppState>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Failed to read upload: {}", e)))?;

        let image_url = state
            .images
            .store(&file_name, content_type.as_deref(), &bytes)
            .await?;

        return Ok(Json(json!({
            "message": "Image uploaded",
            "imageUrl": image_url,
        })));
    }

    Err(UploadError::Missing.into())
}
