use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::property_query::{PropertyFilters, PropertyQuery};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{ImageRef, Property, PropertyWithImages};
use crate::state::AppState;

const ALLOWED_STATUSES: &[&str] = &["available", "pending", "sold", "rented"];

/// Fields accepted when creating or replacing a property. Only title and
/// price are required; everything else is optional listing detail.
#[derive(Debug, Deserialize)]
pub struct PropertyBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub listing_type: Option<String>,
    pub price: Option<Decimal>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_sqft: Option<i32>,
    pub year_built: Option<i32>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    /// Pre-uploaded image ids to associate with the property.
    pub images: Option<Vec<i64>>,
}

impl PropertyBody {
    fn validated(&self) -> Result<(&str, Decimal), ApiError> {
        let title = self
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Title is required"))?;
        let price = self
            .price
            .ok_or_else(|| ApiError::bad_request("Price is required"))?;

        if let Some(status) = &self.status {
            if !ALLOWED_STATUSES.contains(&status.as_str()) {
                return Err(ApiError::bad_request(format!("Invalid status: {}", status)));
            }
        }

        Ok((title, price))
    }
}

/// GET /api/properties - filtered listing with per-property image ids
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<PropertyFilters>,
) -> Result<Json<Value>, ApiError> {
    let rows = PropertyQuery::new(filters).fetch_all(&state.pool).await?;

    if rows.is_empty() {
        return Ok(Json(json!({ "properties": [] })));
    }

    let ids: Vec<i64> = rows.iter().map(|p| p.id).collect();
    let image_map = image_ids_for(&state.pool, &ids).await?;

    let properties: Vec<PropertyWithImages> = rows
        .into_iter()
        .map(|property| {
            let images = image_map.get(&property.id).cloned().unwrap_or_default();
            PropertyWithImages { property, images }
        })
        .collect();

    Ok(Json(json!({ "properties": properties })))
}

/// GET /api/properties/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let property: Property = sqlx::query_as("SELECT * FROM properties WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;

    let images: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM property_images WHERE property_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({ "property": PropertyWithImages { property, images } })))
}

/// POST /api/properties - create a listing owned by the calling agent
///
/// New listings always start out `available`; pre-uploaded image ids are
/// linked inside the same transaction as the insert.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<PropertyBody>,
) -> Result<impl IntoResponse, ApiError> {
    let (title, price) = body.validated()?;

    let mut tx = state.pool.begin().await?;

    let property_id: i64 = sqlx::query_scalar(
        "INSERT INTO properties \
         (title, description, property_type, listing_type, price, address, city, state, \
          zip_code, country, bedrooms, bathrooms, area_sqft, year_built, status, featured, agent_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 'available', $15, $16) \
         RETURNING id",
    )
    .bind(title)
    .bind(&body.description)
    .bind(&body.property_type)
    .bind(&body.listing_type)
    .bind(price)
    .bind(&body.address)
    .bind(&body.city)
    .bind(&body.state)
    .bind(&body.zip_code)
    .bind(body.country.as_deref().unwrap_or("USA"))
    .bind(body.bedrooms.unwrap_or(0))
    .bind(body.bathrooms.unwrap_or(0))
    .bind(body.area_sqft)
    .bind(body.year_built)
    .bind(body.featured.unwrap_or(false))
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(images) = &body.images {
        if !images.is_empty() {
            link_images(&mut tx, property_id, images).await?;
        }
    }

    tx.commit().await?;

    tracing::info!("property {} created by user {}", property_id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Property created", "propertyId": property_id })),
    ))
}

/// PUT /api/properties/:id - replace listing fields
///
/// When an `images` array is supplied the whole association set is replaced:
/// old links are cleared and the new ids are attached, both inside one
/// transaction so a failure cannot strand the property without its images.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PropertyBody>,
) -> Result<Json<Value>, ApiError> {
    let (title, price) = body.validated()?;

    let mut tx = state.pool.begin().await?;

    let result = sqlx::query(
        "UPDATE properties SET \
         title = $1, description = $2, property_type = $3, listing_type = $4, price = $5, \
         address = $6, city = $7, state = $8, zip_code = $9, country = $10, \
         bedrooms = $11, bathrooms = $12, area_sqft = $13, year_built = $14, \
         status = COALESCE($15, status), featured = $16, updated_at = now() \
         WHERE id = $17",
    )
    .bind(title)
    .bind(&body.description)
    .bind(&body.property_type)
    .bind(&body.listing_type)
    .bind(price)
    .bind(&body.address)
    .bind(&body.city)
    .bind(&body.state)
    .bind(&body.zip_code)
    .bind(body.country.as_deref().unwrap_or("USA"))
    .bind(body.bedrooms.unwrap_or(0))
    .bind(body.bathrooms.unwrap_or(0))
    .bind(body.area_sqft)
    .bind(body.year_built)
    .bind(&body.status)
    .bind(body.featured.unwrap_or(false))
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Property not found"));
    }

    if let Some(images) = &body.images {
        sqlx::query("UPDATE property_images SET property_id = NULL WHERE property_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if !images.is_empty() {
            link_images(&mut tx, id, images).await?;
        }
    }

    tx.commit().await?;

    Ok(Json(json!({ "message": "Property updated" })))
}

/// DELETE /api/properties/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let result = sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Property not found"));
    }

    Ok(Json(json!({ "message": "Property deleted" })))
}

/// Attach a set of pre-uploaded images to a property.
async fn link_images(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    property_id: i64,
    image_ids: &[i64],
) -> Result<(), ApiError> {
    sqlx::query("UPDATE property_images SET property_id = $1 WHERE id = ANY($2)")
        .bind(property_id)
        .bind(image_ids)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Batched image-id lookup for a listing page. Ids come back in insertion
/// order (ascending id), which is what the detail endpoint returns too.
async fn image_ids_for(
    pool: &PgPool,
    property_ids: &[i64],
) -> Result<HashMap<i64, Vec<i64>>, ApiError> {
    let refs: Vec<ImageRef> = sqlx::query_as(
        "SELECT id, property_id FROM property_images WHERE property_id = ANY($1) ORDER BY id",
    )
    .bind(property_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
    for image in refs {
        if let Some(property_id) = image.property_id {
            map.entry(property_id).or_default().push(image.id);
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: Value) -> PropertyBody {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn title_and_price_are_required() {
        let missing_title = body(json!({ "price": 450000 }));
        assert!(missing_title.validated().is_err());

        let missing_price = body(json!({ "title": "Lake House" }));
        assert!(missing_price.validated().is_err());

        let blank_title = body(json!({ "title": "   ", "price": 1 }));
        assert!(blank_title.validated().is_err());
    }

    #[test]
    fn minimal_body_is_valid() {
        let minimal = body(json!({
            "title": "Lake House",
            "price": 450000,
            "bedrooms": 3,
            "images": [7, 8]
        }));
        let (title, price) = minimal.validated().unwrap();
        assert_eq!(title, "Lake House");
        assert_eq!(price, Decimal::new(450_000, 0));
        assert_eq!(minimal.images.as_deref(), Some(&[7, 8][..]));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let bad = body(json!({ "title": "x", "price": 1, "status": "haunted" }));
        assert!(bad.validated().is_err());

        let good = body(json!({ "title": "x", "price": 1, "status": "sold" }));
        assert!(good.validated().is_ok());
    }
}
