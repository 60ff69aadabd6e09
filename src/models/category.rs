//! Voting category models.

use serde::{Deserialize, Serialize};

/// A voting category, scoped to a named group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub group: String,
    /// Display ordering within the group
    pub position: i64,
    pub created_at: String,
}

/// Request body for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub position: i64,
}

/// Request body for a partial category update.
///
/// Absent fields keep their current values; the response carries the full
/// resulting entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

/// Per-group projection of a category, used to drive the voting UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingCategory {
    pub id: String,
    pub name: String,
    pub position: i64,
}
