use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    middleware::from_fn,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

use middleware::{authenticate, require_admin, require_staff};
use state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    use handlers::{auth as auth_handlers, favorites, health, images, properties, uploads, users};

    // Routes requiring a valid bearer token.
    let protected = Router::new()
        .route("/api/auth/profile", get(auth_handlers::profile))
        .route("/api/upload/images", post(uploads::upload_images))
        .route("/api/favorites", get(favorites::list).post(favorites::add))
        .route(
            "/api/favorites/:property_id",
            axum::routing::delete(favorites::remove),
        )
        .route("/api/favorites/check/:property_id", get(favorites::check))
        .route_layer(from_fn(authenticate));

    // User administration requires the admin role on top of authentication.
    let admin = Router::new()
        .route(
            "/api/auth/:id",
            put(users::update).delete(users::delete),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(authenticate));

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health::health))
        .route("/api/auth/register", post(auth_handlers::register))
        .route("/api/auth/login", post(auth_handlers::login))
        .route("/api/auth", get(users::list))
        .route("/api/images/:id", get(images::get))
        // Property reads are public; mutations are gated per method on the
        // same paths.
        .route(
            "/api/properties",
            get(properties::list).post(
                properties::create
                    .layer(from_fn(require_staff))
                    .layer(from_fn(authenticate)),
            ),
        )
        .route(
            "/api/properties/:id",
            get(properties::get)
                .put(
                    properties::update
                        .layer(from_fn(require_staff))
                        .layer(from_fn(authenticate)),
                )
                .delete(
                    properties::delete
                        .layer(from_fn(require_staff))
                        .layer(from_fn(authenticate)),
                ),
        )
        .merge(protected)
        .merge(admin)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config::config().api.max_request_size_bytes))
        .with_state(state)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "message": "Real Estate Management API",
        "version": version,
        "endpoints": {
            "auth": "/api/auth",
            "properties": "/api/properties",
            "images": "/api/images/:id",
            "upload": "/api/upload/images",
            "favorites": "/api/favorites",
            "health": "/api/health"
        }
    }))
}
