use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Claims, Role};
use crate::config;
use crate::error::ApiError;

/// Authenticated user context extracted from the bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Stage one of the auth gate: validate the bearer credential and attach the
/// user identity to the request. Missing or invalid credentials are rejected
/// with 401 before any handler runs.
pub async fn authenticate(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;

    let claims = validate_jwt(&token, &config::config().security.jwt_secret)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Stage two for property mutation routes: admin or agent only.
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = attached_user(&request)?;
    if !user.role.is_staff() {
        return Err(ApiError::forbidden("Agent or admin role required"));
    }
    Ok(next.run(request).await)
}

/// Stage two for user administration routes.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = attached_user(&request)?;
    if user.role != Role::Admin {
        return Err(ApiError::forbidden("Admin role required"));
    }
    Ok(next.run(request).await)
}

fn attached_user(request: &Request) -> Result<&AuthUser, ApiError> {
    // Only reachable behind `authenticate`; a missing extension means the
    // route was wired without it.
    request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

/// Extract the token from an `Authorization: Bearer …` header.
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
