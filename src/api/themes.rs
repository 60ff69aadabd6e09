//! Theme API endpoints.
//!
//! Mutations respond with the entire updated collection; clients replace
//! their whole theme cache on every write.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::auth::{meets_floor, Operator};
use crate::errors::AppError;
use crate::models::{CreateThemeRequest, Theme};
use crate::AppState;

fn require_floor(state: &AppState, operator: &Operator) -> Result<(), AppError> {
    if !meets_floor(operator.account.level, state.config.registry_floor) {
        return Err(AppError::Forbidden(
            "Insufficient level to manage themes".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/themes - List all themes.
pub async fn list_themes(State(state): State<AppState>) -> ApiResult<Vec<Theme>> {
    let themes = state.repo.list_themes().await?;
    success(themes)
}

/// POST /api/themes/create - Create a theme, returning the full collection.
pub async fn create_theme(
    State(state): State<AppState>,
    operator: Operator,
    Json(request): Json<CreateThemeRequest>,
) -> ApiResult<Vec<Theme>> {
    require_floor(&state, &operator)?;

    if request.theme_type.trim().is_empty() {
        return Err(AppError::BadRequest("Theme type is required".to_string()));
    }
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("Theme name is required".to_string()));
    }

    state.repo.create_theme(&request).await?;

    let themes = state.repo.list_themes().await?;
    success(themes)
}

/// DELETE /api/themes/delete/{type} - Delete themes of a type, returning the
/// full remaining collection.
pub async fn delete_themes(
    State(state): State<AppState>,
    operator: Operator,
    Path(theme_type): Path<String>,
) -> ApiResult<Vec<Theme>> {
    require_floor(&state, &operator)?;

    state.repo.delete_themes_by_type(&theme_type).await?;

    let themes = state.repo.list_themes().await?;
    success(themes)
}
