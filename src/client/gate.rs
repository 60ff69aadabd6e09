//! Session gate for navigation into protected areas.
//!
//! Mirrors a router's before-each hook: entering the voting area requires a
//! cached identity, loading it once from the server if needed, and falls back
//! to a login redirect decision when none exists.

use super::{ApiClient, CacheState, ClientError};

/// Path prefix that requires an authenticated identity.
pub const PROTECTED_PREFIX: &str = "/vote";

/// Where the login flow starts.
const LOGIN_PATH: &str = "/auth/login";

/// The gate's decision for a navigation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Navigation may proceed
    Proceed,
    /// No identity; the caller should redirect to this URL
    Login(String),
}

impl ApiClient {
    /// Decide whether navigation to `path` may proceed.
    pub async fn guard(
        &self,
        state: &mut CacheState,
        path: &str,
    ) -> Result<GateOutcome, ClientError> {
        if !path.starts_with(PROTECTED_PREFIX) {
            return Ok(GateOutcome::Proceed);
        }

        // Load the identity once if it was never fetched
        if state.me.is_none() {
            self.get_me(state).await?;
        }

        if state.me.is_none() {
            return Ok(GateOutcome::Login(format!(
                "{}{}",
                self.base_url, LOGIN_PATH
            )));
        }

        Ok(GateOutcome::Proceed)
    }
}
