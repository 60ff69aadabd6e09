//! Authorization guard and operator resolution.
//!
//! The level rule lives here and nowhere else: an operator may only target a
//! level strictly below their own. Handlers depend on these functions instead
//! of inlining comparisons.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::errors::AppError;
use crate::models::{Account, ExternalIdentity};
use crate::AppState;

/// Level at or above which a user gets host capability (client-side hint).
pub const HOST_LEVEL: i64 = 2;
/// Level at or above which a user gets moderator capability (client-side hint).
pub const MOD_LEVEL: i64 = 3;
/// Level at or above which a user gets admin capability (client-side hint).
pub const ADMIN_LEVEL: i64 = 4;

/// May an operator of `operator_level` create, modify, or remove a target of
/// `target_level`? Equal levels deny.
pub fn may_target(operator_level: i64, target_level: i64) -> bool {
    target_level < operator_level
}

/// Does `level` satisfy a fixed policy floor?
pub fn meets_floor(level: i64, floor: i64) -> bool {
    level >= floor
}

/// Extract the bearer credential from a request, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// The authenticated account performing a mutating action.
///
/// Resolution: bearer session token -> stored access token -> identity
/// provider -> local account by canonical name. Fails `Unauthenticated` when
/// no usable credential exists and `Forbidden` when the verified identity has
/// no local account.
pub struct Operator {
    pub account: Account,
    pub identity: ExternalIdentity,
    pub session_token: String,
}

impl FromRequestParts<AppState> for Operator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthenticated("Missing session credential".to_string()))?;

        let session = state
            .sessions
            .get(&session_token)
            .ok_or_else(|| AppError::Unauthenticated("Unknown session".to_string()))?;

        let access_token = session.access_token.ok_or_else(|| {
            AppError::Unauthenticated("Session has no access token".to_string())
        })?;

        let identity = state.identity.verify(&access_token).await?;

        let account = state
            .repo
            .get_account(&identity.name)
            .await?
            .ok_or_else(|| {
                tracing::debug!("Verified identity {} has no local account", identity.name);
                AppError::Forbidden("No account exists for this identity".to_string())
            })?;

        Ok(Operator {
            account,
            identity,
            session_token,
        })
    }
}
