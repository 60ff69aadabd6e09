//! Vote model.

use serde::{Deserialize, Serialize};

/// A recorded vote. Belongs to exactly one account and one category; deleted
/// together with its account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub account_external_id: String,
    pub category_id: String,
}
