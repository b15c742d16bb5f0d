use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::config;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{PublicUser, User};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/register - create an account and return a signed token
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = required(&body.email, "Email is required")?;
    let password = required(&body.password, "Password is required")?;
    let full_name = required(&body.full_name, "Full name is required")?;

    let password_hash = hash_password(password)?;

    // Atomic insert-if-absent against the unique email constraint.
    let user: User = sqlx::query_as(
        "INSERT INTO users (email, password_hash, full_name, phone, role) \
         VALUES ($1, $2, $3, $4, 'user') \
         ON CONFLICT (email) DO NOTHING \
         RETURNING *",
    )
    .bind(email)
    .bind(&password_hash)
    .bind(full_name)
    .bind(&body.phone)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::bad_request("Email already registered"))?;

    let token = issue_token(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": token,
            "user": PublicUser::from(user)
        })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = required(&body.email, "Email is required")?;
    let password = required(&body.password, "Password is required")?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&state.pool)
        .await?;

    // Same response for unknown email and wrong password.
    let user = match user {
        Some(user) if verify_password(password, &user.password_hash) => user,
        _ => return Err(ApiError::unauthorized("Invalid email or password")),
    };

    let token = issue_token(&user)?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": PublicUser::from(user)
    })))
}

/// GET /api/auth/profile - the authenticated user's own record
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(auth.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({ "user": PublicUser::from(user) })))
}

fn issue_token(user: &User) -> Result<String, ApiError> {
    let security = &config::config().security;
    let claims = Claims::new(user.id, user.email.clone(), user.role, security.jwt_expiry_hours);
    Ok(generate_jwt(&claims, &security.jwt_secret)?)
}

fn required<'a>(field: &'a Option<String>, message: &str) -> Result<&'a str, ApiError> {
    field
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}
