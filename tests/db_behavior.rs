//! Database-backed tests for the write paths: transactional image relink,
//! insert-if-absent favorites, create-with-images and delete semantics.
//!
//! Ignored by default so the suite runs without infrastructure. Point
//! `DATABASE_URL` at a disposable Postgres and run:
//!
//!     DATABASE_URL=postgres://... cargo test -- --ignored

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use estate_api::auth::{generate_jwt, Claims, Role};
use estate_api::state::AppState;

const JWT_SECRET: &str = "db-behavior-test-secret";

async fn test_pool() -> Result<PgPool> {
    let url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must point at a disposable Postgres"))?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;
    estate_api::database::run_migrations(&pool).await?;
    Ok(pool)
}

fn app(pool: PgPool) -> axum::Router {
    std::env::set_var("JWT_SECRET", JWT_SECRET);
    estate_api::app(AppState::new(pool))
}

fn bearer(id: i64, email: &str, role: Role) -> String {
    let claims = Claims::new(id, email.into(), role, 1);
    format!("Bearer {}", generate_jwt(&claims, JWT_SECRET).unwrap())
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?)
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

/// Reruns against the same database reuse the row; the role is reset so
/// each run starts from a known state.
async fn seed_user(pool: &PgPool, email: &str, role: Role) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, full_name, role) \
         VALUES ($1, 'not-a-real-hash', 'Test User', $2) \
         ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role \
         RETURNING id",
    )
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_image(pool: &PgPool) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO property_images (image_data, mime_type, file_size) \
         VALUES ($1, 'image/png', 4) RETURNING id",
    )
    .bind(&b"\x89PNG"[..])
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_property(pool: &PgPool, agent_id: i64) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO properties (title, price, agent_id) VALUES ('Seeded', 1000, $1) \
         RETURNING id",
    )
    .bind(agent_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn linked_image_ids(pool: &PgPool, property_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT id FROM property_images WHERE property_id = $1 ORDER BY id",
    )
    .bind(property_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn replacing_images_links_exactly_the_new_set() -> Result<()> {
    let pool = test_pool().await?;
    let agent_id = seed_user(&pool, "relink-agent@example.com", Role::Agent).await?;
    let token = bearer(agent_id, "relink-agent@example.com", Role::Agent);

    let first = seed_image(&pool).await?;
    let second = seed_image(&pool).await?;
    let third = seed_image(&pool).await?;

    let response = app(pool.clone())
        .oneshot(json_request(
            "POST",
            "/api/properties",
            &token,
            json!({ "title": "Relink House", "price": 250000, "images": [first, second] }),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let property_id = body_json(response).await?["propertyId"]
        .as_i64()
        .expect("propertyId");

    assert_eq!(linked_image_ids(&pool, property_id).await?, vec![first, second]);

    let response = app(pool.clone())
        .oneshot(json_request(
            "PUT",
            &format!("/api/properties/{property_id}"),
            &token,
            json!({ "title": "Relink House", "price": 250000, "images": [second, third] }),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Exactly the new set is linked; the dropped image survives unattached.
    assert_eq!(linked_image_ids(&pool, property_id).await?, vec![second, third]);
    let orphan: Option<i64> =
        sqlx::query_scalar("SELECT property_id FROM property_images WHERE id = $1")
            .bind(first)
            .fetch_one(&pool)
            .await?;
    assert_eq!(orphan, None);
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn create_with_images_round_trips_the_ids() -> Result<()> {
    let pool = test_pool().await?;
    let agent_id = seed_user(&pool, "roundtrip-agent@example.com", Role::Agent).await?;
    let token = bearer(agent_id, "roundtrip-agent@example.com", Role::Agent);

    let first = seed_image(&pool).await?;
    let second = seed_image(&pool).await?;

    let response = app(pool.clone())
        .oneshot(json_request(
            "POST",
            "/api/properties",
            &token,
            json!({ "title": "Round Trip", "price": 99000, "images": [first, second] }),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let property_id = body_json(response).await?["propertyId"]
        .as_i64()
        .expect("propertyId");

    let response = app(pool)
        .oneshot(
            Request::builder()
                .uri(format!("/api/properties/{property_id}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["property"]["images"], json!([first, second]));
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn duplicate_favorite_keeps_one_row_and_rejects() -> Result<()> {
    let pool = test_pool().await?;
    let agent_id = seed_user(&pool, "favorite-agent@example.com", Role::Agent).await?;
    let user_id = seed_user(&pool, "favorite-user@example.com", Role::User).await?;
    let property_id = seed_property(&pool, agent_id).await?;
    let token = bearer(user_id, "favorite-user@example.com", Role::User);

    let add = json!({ "property_id": property_id });

    let response = app(pool.clone())
        .oneshot(json_request("POST", "/api/favorites", &token, add.clone())?)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app(pool.clone())
        .oneshot(json_request("POST", "/api/favorites", &token, add)?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await?;
    assert_eq!(body["message"], "Property already in favorites");

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM favorites WHERE user_id = $1 AND property_id = $2",
    )
    .bind(user_id)
    .bind(property_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(rows, 1);
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn deleting_absent_property_changes_nothing() -> Result<()> {
    let pool = test_pool().await?;
    let agent_id = seed_user(&pool, "delete-agent@example.com", Role::Agent).await?;
    seed_property(&pool, agent_id).await?;
    let token = bearer(agent_id, "delete-agent@example.com", Role::Agent);

    let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM properties")
        .fetch_one(&pool)
        .await?;

    let response = app(pool.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/properties/9123456789")
                .header(header::AUTHORIZATION, &token)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM properties")
        .fetch_one(&pool)
        .await?;
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn user_update_without_role_keeps_the_stored_role() -> Result<()> {
    let pool = test_pool().await?;
    let target_id = seed_user(&pool, "keep-role@example.com", Role::Agent).await?;
    let admin = bearer(1, "admin@example.com", Role::Admin);

    let response = app(pool.clone())
        .oneshot(json_request(
            "PUT",
            &format!("/api/auth/{target_id}"),
            &admin,
            json!({ "full_name": "Renamed User", "email": "keep-role@example.com" }),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let role: Role = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(target_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(role, Role::Agent);

    // A supplied role still takes effect.
    let response = app(pool.clone())
        .oneshot(json_request(
            "PUT",
            &format!("/api/auth/{target_id}"),
            &admin,
            json!({ "full_name": "Renamed User", "email": "keep-role@example.com", "role": "user" }),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let role: Role = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(target_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(role, Role::User);
    Ok(())
}
