//! Session bootstrap endpoints.
//!
//! The OAuth dance itself happens against the provider; these routes only
//! exchange its outcome for a server-side session.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::bearer_token;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Provider access token; omitted for a pre-auth session
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_token: String,
}

/// POST /auth/session - Exchange a provider access token for a session.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<SessionResponse> {
    // A supplied token must verify before we store it
    if let Some(access_token) = &request.access_token {
        state.identity.verify(access_token).await?;
    }

    let session_token = state.sessions.create(request.access_token);
    success(SessionResponse { session_token })
}

/// DELETE /auth/session - Destroy the caller's session.
pub async fn destroy_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthenticated("Missing session credential".to_string()))?;

    state.sessions.destroy(&token);
    Ok(StatusCode::NO_CONTENT)
}
