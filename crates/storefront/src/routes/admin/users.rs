//! Admin account management.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use oncemore_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::error::{AppError, Result, not_found};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAdmin;
use crate::services::admin_users::{AccountAction, ensure_not_self};
use crate::services::auth::{AccountSpec, AuthError, AuthService};
use crate::state::AppState;

/// `POST /api/admin/users` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
}

/// `PUT /api/admin/users/{id}` payload.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Option<String>,
}

fn parse_role(role: Option<&str>) -> Result<UserRole> {
    role.and_then(|r| r.parse().ok())
        .ok_or_else(|| AppError::BadRequest("Valid role (user or admin) is required.".to_string()))
}

/// `GET /api/admin/users`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.accounts()).list().await?;
    Ok(Json(json!({ "users": users })))
}

/// `POST /api/admin/users`: create a verified account.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, email = %body.email))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    if body.email.trim().is_empty() || body.password.is_empty() || body.full_name.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Email, password, and full name are required.".to_string(),
        ));
    }
    let role = match body.role.as_deref() {
        None => UserRole::User,
        role => parse_role(role)?,
    };

    let user = AuthService::new(state.accounts())
        .create_verified(&AccountSpec {
            email: body.email.trim(),
            password: &body.password,
            full_name: &body.full_name,
            phone: body.phone.as_deref().map(str::trim),
            address: body.address.as_deref().map(str::trim),
            role,
        })
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => {
                AppError::BadRequest("User with this email already exists.".to_string())
            }
            other => other.into(),
        })?;

    info!(user_id = %user.id, role = %user.role, "User created by admin");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully.", "user": user })),
    ))
}

/// `PUT /api/admin/users/{id}`: change a role.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse> {
    let role = parse_role(body.role.as_deref())?;
    ensure_not_self(admin.id, id, AccountAction::ChangeRole)?;

    let user = UserRepository::new(state.accounts())
        .update_role(id, role)
        .await
        .map_err(not_found("User not found."))?;

    info!(user_id = %id, %role, "User role updated");
    Ok(Json(
        json!({ "message": "User role updated successfully.", "user": user }),
    ))
}

/// `DELETE /api/admin/users/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<impl IntoResponse> {
    ensure_not_self(admin.id, id, AccountAction::Delete)?;

    UserRepository::new(state.accounts())
        .delete(id)
        .await
        .map_err(not_found("User not found."))?;

    info!(user_id = %id, "User deleted");
    Ok(Json(json!({ "message": "User deleted successfully." })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(Some("admin")).unwrap(), UserRole::Admin);
        assert_eq!(parse_role(Some("user")).unwrap(), UserRole::User);

        for bad in [None, Some(""), Some("root"), Some("Admin ")] {
            let err = parse_role(bad).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }
}
