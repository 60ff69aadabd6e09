//! User API endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::{success, ApiResult};
use crate::auth::{bearer_token, may_target, Operator};
use crate::errors::AppError;
use crate::models::{Account, AccountView, CreateAccountRequest};
use crate::AppState;

/// GET /api/me - Resolve the caller's own profile.
///
/// A session without a stored access token is rejected before any provider
/// contact. A verified identity with no local account is a normal not-found,
/// never a server error.
pub async fn get_me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<AccountView> {
    let session_token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthenticated("Missing session credential".to_string()))?;

    let session = state
        .sessions
        .get(&session_token)
        .ok_or_else(|| AppError::Unauthenticated("Unknown session".to_string()))?;

    let access_token = session
        .access_token
        .ok_or_else(|| AppError::Unauthenticated("Session has no access token".to_string()))?;

    let identity = state.identity.verify(&access_token).await?;

    match state.repo.get_account(&identity.name).await? {
        Some(account) => success(AccountView {
            identity,
            level: account.level,
            flags: account.flags,
        }),
        None => Err(AppError::NotFound(format!(
            "No account exists for {}",
            identity.name
        ))),
    }
}

/// GET /api/users - List all accounts.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<Account>> {
    let accounts = state.repo.list_accounts().await?;
    success(accounts)
}

/// POST /api/user - Register a new account bound to a verified identity.
pub async fn create_user(
    State(state): State<AppState>,
    operator: Operator,
    Json(request): Json<CreateAccountRequest>,
) -> ApiResult<Account> {
    if request.external_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "External id is required".to_string(),
        ));
    }
    if request.level < 0 {
        return Err(AppError::BadRequest("Level must be >= 0".to_string()));
    }

    if !may_target(operator.account.level, request.level) {
        return Err(AppError::Forbidden(
            "You can only set users to levels below your own".to_string(),
        ));
    }

    // The lookup below is case-insensitive, so the check agrees with the
    // canonical casing the insert will store.
    if state.repo.get_account(&request.external_id).await?.is_some() {
        return Err(AppError::Conflict("That user is already present".to_string()));
    }

    // Canonicalize the name in case the capitalization differs
    let identity = state.identity.lookup(&request.external_id).await?;

    tracing::info!(
        external_id = %identity.name,
        level = request.level,
        operator = %operator.account.external_id,
        "Registering account"
    );

    let account = state
        .repo
        .create_account(&identity, request.level, &request.flags)
        .await?;
    success(account)
}

/// DELETE /api/user/{externalId} - Remove an account and its votes.
pub async fn delete_user(
    State(state): State<AppState>,
    operator: Operator,
    Path(external_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let target = state
        .repo
        .get_account(&external_id)
        .await?
        .ok_or_else(|| AppError::NotFound("The specified user does not exist".to_string()))?;

    if !may_target(operator.account.level, target.level) {
        return Err(AppError::Forbidden(
            "You can only remove users of lower level than yourself".to_string(),
        ));
    }

    state.repo.delete_account(&target.external_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/user/deleteaccount - Self-deregistration.
///
/// Bypasses the level check: a user may always remove themself. Deletes the
/// account and its votes and invalidates the session.
pub async fn self_deregister(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let session_token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthenticated("Missing session credential".to_string()))?;

    let session = state
        .sessions
        .get(&session_token)
        .ok_or_else(|| AppError::Unauthenticated("Unknown session".to_string()))?;

    let access_token = session
        .access_token
        .ok_or_else(|| AppError::Unauthenticated("Session has no access token".to_string()))?;

    let identity = state.identity.verify(&access_token).await?;

    state.repo.purge_account(&identity.name).await?;
    state.sessions.destroy(&session_token);

    Ok(StatusCode::NO_CONTENT)
}
