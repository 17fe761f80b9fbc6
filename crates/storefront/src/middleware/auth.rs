//! Authentication middleware and extractors.
//!
//! The session carries a [`CurrentUser`] snapshot taken at login. Admin
//! routes are gated twice: [`require_admin_session`] checks the session role
//! at the router, and [`RequireAdmin`] re-reads the role from the database in
//! each handler so a demoted admin loses access immediately.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::session::keys;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

fn not_authenticated() -> AppError {
    AppError::Unauthorized("Not authenticated.".to_string())
}

fn admin_required() -> AppError {
    AppError::Forbidden("Admin access required.".to_string())
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or_else(not_authenticated)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Extractor that requires a user whose stored role is currently `admin`.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = session_user(parts).await.ok_or_else(not_authenticated)?;

        let role = UserRepository::new(state.accounts())
            .get_role(user.id)
            .await?
            .ok_or_else(not_authenticated)?;

        if !role.is_admin() {
            tracing::warn!(user_id = %user.id, "Non-admin attempted admin action");
            return Err(admin_required());
        }

        Ok(Self(CurrentUser { role, ..user }))
    }
}

/// Router-level gate for `/api/admin/*`: rejects requests whose session
/// does not carry the admin role.
pub async fn require_admin_session(
    OptionalAuth(user): OptionalAuth,
    request: Request,
    next: Next,
) -> Response {
    match user {
        None => not_authenticated().into_response(),
        Some(user) if !user.role.is_admin() => admin_required().into_response(),
        Some(_) => next.run(request).await,
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    Ok(())
}
