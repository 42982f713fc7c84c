//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `CurrentUser` — the verified buyer identity forwarded by the
//!   fronting auth layer, or `None` for guests.
//! - `AdminAuth` — back-office authentication against the argon2-hashed
//!   admin secret.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::state::AppState;

/// Header carrying the verified user id, set by the auth layer in
/// front of this service.
pub const USER_ID_HEADER: &str = "x-auth-user-id";
/// Header carrying the verified user email.
pub const USER_EMAIL_HEADER: &str = "x-auth-email";

/// A verified, logged-in buyer.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// CurrentUser — buyer identity from the fronting auth layer
// ---------------------------------------------------------------------------

/// Extractor yielding `Some(UserIdentity)` for logged-in buyers and
/// `None` for guests. Identity verification itself happens upstream;
/// this only reads what the auth layer forwarded.
pub struct CurrentUser(pub Option<UserIdentity>);

/// Errors returned by the [`CurrentUser`] extractor.
#[derive(Debug)]
pub enum CurrentUserError {
    MalformedUserId,
    MalformedEmail,
}

impl IntoResponse for CurrentUserError {
    fn into_response(self) -> Response {
        let message = match self {
            CurrentUserError::MalformedUserId => "malformed user id header",
            CurrentUserError::MalformedEmail => "malformed email header",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = CurrentUserError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(raw_id) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(CurrentUser(None));
        };

        let user_id = raw_id
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(CurrentUserError::MalformedUserId)?;

        let email = match parts.headers.get(USER_EMAIL_HEADER) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| CurrentUserError::MalformedEmail)?
                    .to_string(),
            ),
            None => None,
        };

        Ok(CurrentUser(Some(UserIdentity { user_id, email })))
    }
}

// ---------------------------------------------------------------------------
// AdminAuth — back-office authentication via bearer secret
// ---------------------------------------------------------------------------

/// Extractor verifying `Authorization: Bearer {secret}` against the
/// configured argon2 hash.
pub struct AdminAuth;

/// Errors returned by the [`AdminAuth`] extractor.
#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidHeader,
    VerificationFailed,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminAuthError::MissingHeader => {
                (StatusCode::UNAUTHORIZED, "missing Authorization header")
            }
            AdminAuthError::InvalidHeader => {
                (StatusCode::BAD_REQUEST, "invalid Authorization header")
            }
            AdminAuthError::VerificationFailed => {
                (StatusCode::UNAUTHORIZED, "admin secret verification failed")
            }
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?;

        let secret = header
            .strip_prefix("Bearer ")
            .ok_or(AdminAuthError::InvalidHeader)?;

        let admin = state.config.admin.read().await;
        if !admin.verify(secret) {
            return Err(AdminAuthError::VerificationFailed);
        }
        drop(admin);

        Ok(AdminAuth)
    }
}
