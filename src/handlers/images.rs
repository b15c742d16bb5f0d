use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::error::ApiError;
use crate::models::StoredImage;
use crate::state::AppState;

/// GET /api/images/:id - serve stored image bytes with their mime type
///
/// The id arrives as a raw path segment so a non-numeric value maps to 400
/// rather than a routing miss.
pub async fn get(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let image_id: i64 = raw_id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid image id"))?;

    let image: StoredImage = sqlx::query_as(
        "SELECT image_data, mime_type FROM property_images WHERE id = $1",
    )
    .bind(image_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Image not found"))?;

    if image.image_data.is_empty() {
        tracing::error!("image {} has no data", image_id);
        return Err(ApiError::internal_server_error("Image data missing"));
    }

    let content_type = if image.mime_type.is_empty() {
        "image/png".to_string()
    } else {
        image.mime_type
    };

    Ok(([(header::CONTENT_TYPE, content_type)], image.image_data))
}
