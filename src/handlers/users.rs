use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Role;
use crate::error::ApiError;
use crate::models::UserWithPropertyCount;
use crate::state::AppState;

// Postgres SQLSTATE for unique violations (duplicate email).
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

/// GET /api/auth - user administration listing with per-agent listing counts
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let users: Vec<UserWithPropertyCount> = sqlx::query_as(
        "SELECT u.id, u.email, u.full_name, u.phone, u.role, u.profile_image, u.created_at, \
                COUNT(DISTINCT p.id) AS property_count \
         FROM users u \
         LEFT JOIN properties p ON u.id = p.agent_id \
         GROUP BY u.id, u.email, u.full_name, u.phone, u.role, u.profile_image, u.created_at \
         ORDER BY u.created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    // Shape expected by the admin dashboard.
    let users: Vec<Value> = users
        .into_iter()
        .map(|u| {
            json!({
                "id": u.id,
                "email": u.email,
                "name": u.full_name,
                "phone": u.phone,
                "role": u.role,
                "profile_image": u.profile_image,
                "status": "active",
                "joinDate": u.created_at,
                "properties": u.property_count,
                "avatar": avatar_initial(&u.full_name, &u.email)
            })
        })
        .collect();

    Ok(Json(json!({ "users": users })))
}

/// PUT /api/auth/:id - admin update of a user's profile and role
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let full_name = body
        .full_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Full name is required"))?;
    let email = body
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;
    // An omitted role keeps the stored one rather than resetting it.
    let result = sqlx::query(
        "UPDATE users SET full_name = $1, email = $2, phone = $3, \
         role = COALESCE($4, role) WHERE id = $5",
    )
    .bind(full_name)
    .bind(email)
    .bind(&body.phone)
    .bind(body.role)
    .bind(id)
    .execute(&state.pool)
    .await
    .map_err(|e| {
        let code = e
            .as_database_error()
            .and_then(|d| d.code().map(|c| c.to_string()));
        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => ApiError::bad_request("Email already in use"),
            _ => e.into(),
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(json!({ "message": "User updated successfully" })))
}

/// DELETE /api/auth/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// First letter of the display name (falling back to the email) for the
/// dashboard avatar badge.
fn avatar_initial(full_name: &str, email: &str) -> String {
    full_name
        .chars()
        .chain(email.chars())
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "U".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_prefers_name_then_email() {
        assert_eq!(avatar_initial("alice", "a@b.c"), "A");
        assert_eq!(avatar_initial("", "bob@example.com"), "B");
        assert_eq!(avatar_initial("", ""), "U");
        assert_eq!(avatar_initial("  ", "@!"), "U");
    }
}
