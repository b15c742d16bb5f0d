use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::FavoriteListing;
use crate::state::AppState;

// Postgres SQLSTATE for foreign-key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub property_id: Option<i64>,
}

/// GET /api/favorites - the caller's bookmarks joined with listing details
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let favorites: Vec<FavoriteListing> = sqlx::query_as(
        "SELECT f.id, f.property_id, f.created_at, \
                p.title, p.price, p.address, p.city, p.state, p.property_type, \
                p.bedrooms, p.bathrooms, p.area_sqft, p.status, p.featured \
         FROM favorites f \
         JOIN properties p ON f.property_id = p.id \
         WHERE f.user_id = $1 \
         ORDER BY f.created_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({ "favorites": favorites })))
}

/// POST /api/favorites - bookmark a property
///
/// A single insert-if-absent against the (user_id, property_id) uniqueness
/// constraint, so two concurrent identical requests cannot both succeed.
pub async fn add(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<AddFavoriteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let property_id = body
        .property_id
        .ok_or_else(|| ApiError::bad_request("Property ID is required"))?;

    let inserted: Option<i64> = sqlx::query_scalar(
        "INSERT INTO favorites (user_id, property_id) VALUES ($1, $2) \
         ON CONFLICT (user_id, property_id) DO NOTHING \
         RETURNING id",
    )
    .bind(user.id)
    .bind(property_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        let code = e
            .as_database_error()
            .and_then(|d| d.code().map(|c| c.to_string()));
        match code.as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => ApiError::not_found("Property not found"),
            _ => e.into(),
        }
    })?;

    let id = inserted.ok_or_else(|| ApiError::bad_request("Property already in favorites"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Property added to favorites",
            "favorite": {
                "id": id,
                "user_id": user.id,
                "property_id": property_id
            }
        })),
    ))
}

/// DELETE /api/favorites/:property_id
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(property_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND property_id = $2")
        .bind(user.id)
        .bind(property_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Favorite not found"));
    }

    Ok(Json(json!({ "message": "Property removed from favorites" })))
}

/// GET /api/favorites/check/:property_id
pub async fn check(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(property_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let is_favorited: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND property_id = $2)",
    )
    .bind(user.id)
    .bind(property_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(json!({ "isFavorited": is_favorited })))
}
