//! Theme models.
//!
//! Theme mutations return the entire updated collection, never a delta, so
//! clients always replace their cached set wholesale.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named visual configuration set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: String,
    pub theme_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    pub created_at: String,
}

/// Request body for creating a theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThemeRequest {
    pub theme_type: String,
    pub name: String,
    #[serde(default)]
    pub config: Option<Value>,
}
