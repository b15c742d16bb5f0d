use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{json, Value};

use crate::config;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/upload/images - store uploaded files as unattached images
///
/// Accepts up to `max_upload_files` multipart files under the `images` field,
/// each capped at `max_upload_file_bytes`. Rows are created with a NULL
/// property_id; association happens later through the property endpoints.
///
/// The whole request is validated before anything is written, and the
/// inserts share one transaction, so a rejected upload leaves no rows
/// behind.
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let limits = &config::config().api;
    let mut files: Vec<(String, axum::body::Bytes)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart payload"))?
    {
        if field.name() != Some("images") {
            continue;
        }

        if files.len() >= limits.max_upload_files {
            return Err(ApiError::bad_request(format!(
                "Too many files (max {})",
                limits.max_upload_files
            )));
        }

        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("Failed to read uploaded file"))?;

        if data.len() > limits.max_upload_file_bytes {
            return Err(ApiError::bad_request(format!(
                "File too large (max {} bytes)",
                limits.max_upload_file_bytes
            )));
        }

        files.push((mime_type, data));
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("No files uploaded"));
    }

    let mut tx = state.pool.begin().await?;
    let mut image_ids: Vec<i64> = Vec::with_capacity(files.len());

    for (mime_type, data) in &files {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO property_images (property_id, image_data, mime_type, file_size, is_primary) \
             VALUES (NULL, $1, $2, $3, FALSE) RETURNING id",
        )
        .bind(data.to_vec())
        .bind(mime_type)
        .bind(data.len() as i64)
        .fetch_one(&mut *tx)
        .await?;

        image_ids.push(id);
    }

    tx.commit().await?;

    Ok(Json(json!({
        "message": "Images uploaded successfully",
        "images": image_ids
    })))
}
