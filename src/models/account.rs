//! Account model and the profile shapes around it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A local account bound to a verified external identity.
///
/// `external_id` is the provider's canonical casing, resolved at creation
/// time; it is the natural key for every account operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub external_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Provider-reported account creation time, epoch seconds
    pub created_at: i64,
    /// Privilege level; higher strictly dominates lower
    pub level: i64,
    /// Opaque per-account flag bag
    #[serde(default)]
    pub flags: Value,
}

/// The verified identity the provider reports for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdentity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_utc: i64,
}

/// Merged view returned by the self-profile lookup: live provider profile
/// plus the local privilege data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub identity: ExternalIdentity,
    pub level: i64,
    pub flags: Value,
}

/// Request body for registering a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// Candidate external name; casing is canonicalized from the provider
    pub external_id: String,
    pub level: i64,
    #[serde(default)]
    pub flags: Value,
}
