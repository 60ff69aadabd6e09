//! Category API endpoints, including the per-group voting projection.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{success, ApiResult};
use crate::auth::{meets_floor, Operator};
use crate::errors::AppError;
use crate::models::{Category, CreateCategoryRequest, UpdateCategoryRequest, VotingCategory};
use crate::AppState;

fn require_floor(state: &AppState, operator: &Operator) -> Result<(), AppError> {
    if !meets_floor(operator.account.level, state.config.registry_floor) {
        return Err(AppError::Forbidden(
            "Insufficient level to manage categories".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/categories - List all categories.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = state.repo.list_categories().await?;
    success(categories)
}

/// POST /api/category - Create a new category.
pub async fn create_category(
    State(state): State<AppState>,
    operator: Operator,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<Category> {
    require_floor(&state, &operator)?;

    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("Category name is required".to_string()));
    }
    if request.group.trim().is_empty() {
        return Err(AppError::BadRequest("Category group is required".to_string()));
    }

    let category = state.repo.create_category(&request).await?;
    success(category)
}

/// PATCH /api/category/{id} - Partially update a category.
///
/// The response carries the full resulting entity so clients can
/// splice-replace their cached copy.
pub async fn update_category(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<String>,
    Json(request): Json<UpdateCategoryRequest>,
) -> ApiResult<Category> {
    require_floor(&state, &operator)?;

    let category = state.repo.update_category(&id, &request).await?;
    success(category)
}

/// DELETE /api/category/{id} - Delete a category.
pub async fn delete_category(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_floor(&state, &operator)?;

    state.repo.delete_category(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/categories/{group} - Voting projection of a group's categories.
pub async fn list_voting_categories(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> ApiResult<Vec<VotingCategory>> {
    let voting_categories = state.repo.list_voting_categories(&group).await?;
    success(voting_categories)
}
