//! Client SDK: request/response envelope, state cache, and session gate.
//!
//! All server communication flows through `ApiClient::execute`; no action
//! talks to the transport directly. Every action takes the caller's cache and
//! folds in an event only after the server confirms success, so a failure
//! aborts the flow with the cache untouched.

mod cache;
mod gate;

pub use cache::{CacheEvent, CacheState};
pub use gate::{GateOutcome, PROTECTED_PREFIX};

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{codes, ErrorResponse};
use crate::models::{
    Account, AccountView, Category, CreateAccountRequest, CreateCategoryRequest,
    CreateThemeRequest, Theme, UpdateCategoryRequest, VotingCategory,
};

/// Client-side failure.
#[derive(Debug)]
pub enum ClientError {
    /// Structured error the server surfaced
    Api { code: String, message: String },
    /// The call never produced a usable response
    Transport(String),
    /// Local cache inconsistency (splice target missing or unloaded)
    Invariant(String),
}

impl ClientError {
    /// Does this carry the given server error code?
    pub fn is_code(&self, expected: &str) -> bool {
        matches!(self, ClientError::Api { code, .. } if code == expected)
    }

    pub fn code(&self) -> &str {
        match self {
            ClientError::Api { code, .. } => code,
            ClientError::Transport(_) => codes::PROVIDER_ERROR,
            ClientError::Invariant(_) => codes::INVARIANT_VIOLATION,
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Api { code, message } => write!(f, "{}: {}", code, message),
            ClientError::Transport(msg) => write!(f, "transport error: {}", msg),
            ClientError::Invariant(msg) => write!(f, "cache invariant violated: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

/// HTTP client for the voting backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: None,
        }
    }

    pub fn with_session(mut self, session_token: &str) -> Self {
        self.session_token = Some(session_token.to_string());
        self
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// The single chokepoint for server communication.
    ///
    /// Serializes the body when one is given, raises the server's structured
    /// error on a non-success status, and maps a no-content status to an
    /// absent payload.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, ClientError> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path));

        if let Some(token) = &self.session_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();

        if !status.is_success() {
            let envelope: ErrorResponse = response.json().await.map_err(transport)?;
            return Err(ClientError::Api {
                code: envelope.error.code,
                message: envelope.error.message,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let envelope: Value = response.json().await.map_err(transport)?;
        match envelope {
            Value::Object(mut fields) => Ok(Some(fields.remove("data").unwrap_or(Value::Null))),
            other => Err(ClientError::Transport(format!(
                "unexpected response shape: {}",
                other
            ))),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let payload = self
            .execute(method, path, body)
            .await?
            .ok_or_else(|| ClientError::Transport("missing response payload".to_string()))?;
        serde_json::from_value(payload)
            .map_err(|e| ClientError::Transport(format!("undecodable payload: {}", e)))
    }

    async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(), ClientError> {
        self.execute(method, path, body).await?;
        Ok(())
    }

    // ==================== USER ACTIONS ====================

    /// Load the caller's own profile. Being signed out (or having no local
    /// account) is a normal result, not an error; the cache is left as-is so
    /// `me` stays unloaded.
    pub async fn get_me(&self, state: &mut CacheState) -> Result<(), ClientError> {
        match self
            .request::<AccountView>(Method::GET, "/api/me", None)
            .await
        {
            Ok(me) => state.apply(CacheEvent::MeLoaded(Some(me))),
            Err(ClientError::Api { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub async fn get_users(&self, state: &mut CacheState) -> Result<(), ClientError> {
        let users: Vec<Account> = self.request(Method::GET, "/api/users", None).await?;
        state.apply(CacheEvent::UsersLoaded(users))
    }

    pub async fn add_user(
        &self,
        state: &mut CacheState,
        request: &CreateAccountRequest,
    ) -> Result<(), ClientError> {
        let account: Account = self
            .request(Method::POST, "/api/user", Some(to_body(request)?))
            .await?;
        state.apply(CacheEvent::UserAdded(account))
    }

    pub async fn remove_user(
        &self,
        state: &mut CacheState,
        external_id: &str,
    ) -> Result<(), ClientError> {
        self.request_empty(Method::DELETE, &format!("/api/user/{}", external_id), None)
            .await?;
        state.apply(CacheEvent::UserRemoved(external_id.to_string()))
    }

    /// Delete the caller's own account. The session is gone afterwards, on
    /// the server and here.
    pub async fn self_deregister(&mut self, state: &mut CacheState) -> Result<(), ClientError> {
        self.request_empty(Method::POST, "/api/user/deleteaccount", None)
            .await?;
        self.session_token = None;
        state.apply(CacheEvent::MeLoaded(None))
    }

    // ==================== CATEGORY ACTIONS ====================

    pub async fn get_categories(&self, state: &mut CacheState) -> Result<(), ClientError> {
        let categories: Vec<Category> = self.request(Method::GET, "/api/categories", None).await?;
        state.apply(CacheEvent::CategoriesLoaded(categories))
    }

    pub async fn create_category(
        &self,
        state: &mut CacheState,
        request: &CreateCategoryRequest,
    ) -> Result<(), ClientError> {
        let category: Category = self
            .request(Method::POST, "/api/category", Some(to_body(request)?))
            .await?;
        state.apply(CacheEvent::CategoryCreated(category))
    }

    /// Patch a category; the server responds with the full resulting entity,
    /// which replaces the cached copy at its located index.
    pub async fn update_category(
        &self,
        state: &mut CacheState,
        id: &str,
        patch: &UpdateCategoryRequest,
    ) -> Result<(), ClientError> {
        let category: Category = self
            .request(
                Method::PATCH,
                &format!("/api/category/{}", id),
                Some(to_body(patch)?),
            )
            .await?;
        state.apply(CacheEvent::CategoryUpdated(category))
    }

    pub async fn delete_category(
        &self,
        state: &mut CacheState,
        id: &str,
    ) -> Result<(), ClientError> {
        self.request_empty(Method::DELETE, &format!("/api/category/{}", id), None)
            .await?;
        state.apply(CacheEvent::CategoryDeleted(id.to_string()))
    }

    pub async fn get_voting_categories(
        &self,
        state: &mut CacheState,
        group: &str,
    ) -> Result<(), ClientError> {
        let voting_categories: Vec<VotingCategory> = self
            .request(Method::GET, &format!("/api/categories/{}", group), None)
            .await?;
        state.apply(CacheEvent::VotingCategoriesLoaded(voting_categories))
    }

    // ==================== THEME ACTIONS ====================
    // Theme responses carry the entire collection; the cache is replaced
    // wholesale on every one of these.

    pub async fn get_themes(&self, state: &mut CacheState) -> Result<(), ClientError> {
        let themes: Vec<Theme> = self.request(Method::GET, "/api/themes", None).await?;
        state.apply(CacheEvent::ThemesReplaced(themes))
    }

    pub async fn create_theme(
        &self,
        state: &mut CacheState,
        request: &CreateThemeRequest,
    ) -> Result<(), ClientError> {
        let themes: Vec<Theme> = self
            .request(Method::POST, "/api/themes/create", Some(to_body(request)?))
            .await?;
        state.apply(CacheEvent::ThemesReplaced(themes))
    }

    pub async fn delete_themes(
        &self,
        state: &mut CacheState,
        theme_type: &str,
    ) -> Result<(), ClientError> {
        let themes: Vec<Theme> = self
            .request(
                Method::DELETE,
                &format!("/api/themes/delete/{}", theme_type),
                None,
            )
            .await?;
        state.apply(CacheEvent::ThemesReplaced(themes))
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value)
        .map_err(|e| ClientError::Transport(format!("unserializable body: {}", e)))
}

fn transport(err: reqwest::Error) -> ClientError {
    ClientError::Transport(err.to_string())
}
