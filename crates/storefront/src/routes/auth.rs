//! Authentication route handlers.
//!
//! Registration with an emailed one-time code, password login backed by a
//! Postgres session, and the signed-in user's own profile.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::db::UserRepository;
use crate::db::users::ProfileUpdate;
use crate::error::{AppError, Result, not_found};
use crate::extract::ApiJson;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthService, PendingVerification, Registration};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// OTP verification payload.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Profile update payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

// =============================================================================
// Registration
// =============================================================================

/// `POST /api/auth/register`
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    if blank(&body.email) || body.password.is_empty() || blank(&body.full_name) {
        return Err(AppError::BadRequest(
            "Email, password, and full name are required.".to_string(),
        ));
    }

    let PendingVerification { user, otp } = AuthService::new(state.accounts())
        .register(&Registration {
            email: body.email.trim(),
            password: &body.password,
            full_name: body.full_name.trim(),
            phone: body.phone.as_deref().map(str::trim),
            address: body.address.as_deref().map(str::trim),
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    // Delivery failures must not fail the registration
    let background = state.clone();
    tokio::spawn(async move {
        let Some(email) = background.email() else {
            warn!(user_id = %user.id, "SMTP not configured; registration code not sent");
            return;
        };
        if let Err(e) = email
            .send_otp(user.email.as_str(), &user.full_name, &otp)
            .await
        {
            warn!(user_id = %user.id, error = %e, "Failed to send registration code");
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully." })),
    ))
}

/// `POST /api/auth/verify-otp`
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse> {
    if blank(&body.email) || blank(&body.otp) {
        return Err(AppError::BadRequest("Email and OTP are required.".to_string()));
    }

    let user = AuthService::new(state.accounts())
        .verify_otp(body.email.trim(), body.otp.trim())
        .await?;

    info!(user_id = %user.id, "Account verified");
    Ok(Json(json!({ "message": "Account verified successfully." })))
}

// =============================================================================
// Session
// =============================================================================

/// `POST /api/auth/login`
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    if blank(&body.email) || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    }

    let user = AuthService::new(state.accounts())
        .login(body.email.trim(), &body.password)
        .await?;

    // New session id on privilege change
    session.cycle_id().await?;
    set_current_user(
        &session,
        &CurrentUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        },
    )
    .await?;

    info!(user_id = %user.id, role = %user.role, "User logged in");
    Ok(Json(json!({ "message": "Login successful.", "user": user })))
}

/// `POST /api/auth/logout`
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<impl IntoResponse> {
    clear_current_user(&session).await?;
    session.flush().await?;
    Ok(Json(json!({ "message": "Logged out." })))
}

// =============================================================================
// Profile
// =============================================================================

/// `GET /api/auth/me`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let user = UserRepository::new(state.accounts())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    Ok(Json(json!({ "user": user })))
}

/// `PATCH /api/auth/me`
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse> {
    let update = ProfileUpdate {
        full_name: trimmed(body.full_name),
        phone: trimmed(body.phone),
        address: trimmed(body.address),
    };
    if update.is_empty() {
        return Err(AppError::BadRequest(
            "At least one of address, fullName or phone is required.".to_string(),
        ));
    }

    let user = UserRepository::new(state.accounts())
        .update_profile(user.id, &update)
        .await
        .map_err(not_found("User not found."))?;

    Ok(Json(json!({ "user": user, "message": "Profile updated." })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_accepts_camel_case() {
        let body: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@b.in","password":"secret1","fullName":"Asha","phone":"9876543210"}"#,
        )
        .unwrap();
        assert_eq!(body.full_name, "Asha");
        assert_eq!(body.phone.as_deref(), Some("9876543210"));
        assert!(body.address.is_none());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let body: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(blank(&body.email));
        assert!(body.password.is_empty());
    }

    #[test]
    fn test_trimmed_drops_blank_values() {
        assert_eq!(trimmed(Some("  ".to_string())), None);
        assert_eq!(trimmed(Some(" Pune ".to_string())), Some("Pune".to_string()));
        assert_eq!(trimmed(None), None);
    }
}
