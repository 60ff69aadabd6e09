//! Identity verifier: read-only client for the external identity provider.
//!
//! Two call sites use it: resolving "who is calling" from a session access
//! token, and canonicalizing a target user's name at registration time.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::AppError;
use crate::models::ExternalIdentity;

/// Profile shape the provider returns for both endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderProfile {
    name: String,
    #[serde(default)]
    avatar_url: Option<String>,
    created_utc: i64,
}

impl From<ProviderProfile> for ExternalIdentity {
    fn from(profile: ProviderProfile) -> Self {
        ExternalIdentity {
            name: profile.name,
            avatar_url: profile.avatar_url,
            created_utc: profile.created_utc,
        }
    }
}

/// Client for the external identity provider.
#[derive(Clone)]
pub struct IdentityVerifier {
    http: reqwest::Client,
    base_url: String,
}

impl IdentityVerifier {
    /// Build a verifier against the given provider base URL. Every upstream
    /// call is bounded by `timeout` and surfaces expiry as a provider error.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Provider(format!("Identity client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve the identity behind an access token ("who am I").
    pub async fn verify(&self, access_token: &str) -> Result<ExternalIdentity, AppError> {
        let response = self
            .http
            .get(format!("{}/api/v1/me", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(provider_error)?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(AppError::Unauthenticated(
                "Identity provider rejected the access token".to_string(),
            )),
            status if status.is_success() => {
                let profile: ProviderProfile = response.json().await.map_err(provider_error)?;
                Ok(profile.into())
            }
            status => Err(AppError::Provider(format!(
                "Identity provider returned {}",
                status
            ))),
        }
    }

    /// Look up a user by name and return the provider's canonical record.
    pub async fn lookup(&self, username: &str) -> Result<ExternalIdentity, AppError> {
        let response = self
            .http
            .get(format!("{}/api/v1/users/{}", self.base_url, username))
            .send()
            .await
            .map_err(provider_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AppError::UnknownIdentity(format!(
                "No identity named {} exists at the provider",
                username
            ))),
            status if status.is_success() => {
                let profile: ProviderProfile = response.json().await.map_err(provider_error)?;
                Ok(profile.into())
            }
            status => Err(AppError::Provider(format!(
                "Identity provider returned {}",
                status
            ))),
        }
    }
}

fn provider_error(err: reqwest::Error) -> AppError {
    tracing::warn!("Identity provider call failed: {}", err);
    AppError::Provider(format!("Identity provider call failed: {}", err))
}
