//! Integration tests for the awards-vote backend and client SDK.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::client::{ApiClient, CacheState, GateOutcome};
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::errors::codes;
use crate::identity::IdentityVerifier;
use crate::models::{
    CreateAccountRequest, CreateCategoryRequest, CreateThemeRequest, ExternalIdentity,
    UpdateCategoryRequest,
};
use crate::session::SessionStore;
use crate::{create_router, AppState};

/// In-process stand-in for the external identity provider.
///
/// Tracks how many times it was contacted so tests can assert that certain
/// flows never reach it.
#[derive(Clone, Default)]
struct MockProvider {
    /// canonical profiles keyed by lowercased name
    identities: Arc<RwLock<HashMap<String, Value>>>,
    /// access token -> lowercased name
    tokens: Arc<RwLock<HashMap<String, String>>>,
    hits: Arc<AtomicUsize>,
}

impl MockProvider {
    fn add_identity(&self, canonical_name: &str) {
        let profile = json!({
            "name": canonical_name,
            "avatarUrl": format!("https://cdn.example.com/{}.png", canonical_name),
            "createdUtc": 1_600_000_000,
        });
        self.identities
            .write()
            .unwrap()
            .insert(canonical_name.to_lowercase(), profile);
    }

    fn issue_token(&self, name: &str) -> String {
        let token = format!("access-{}", uuid::Uuid::new_v4());
        self.tokens
            .write()
            .unwrap()
            .insert(token.clone(), name.to_lowercase());
        token
    }

    fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/v1/me", get(provider_me))
            .route("/api/v1/users/{name}", get(provider_user))
            .with_state(self.clone())
    }
}

async fn provider_me(
    State(provider): State<MockProvider>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    provider.hits.fetch_add(1, Ordering::SeqCst);

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let name = provider
        .tokens
        .read()
        .unwrap()
        .get(token)
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let profile = provider
        .identities
        .read()
        .unwrap()
        .get(&name)
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok(Json(profile))
}

async fn provider_user(
    State(provider): State<MockProvider>,
    Path(name): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    provider.hits.fetch_add(1, Ordering::SeqCst);

    let profile = provider
        .identities
        .read()
        .unwrap()
        .get(&name.to_lowercase())
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(profile))
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    sessions: SessionStore,
    provider: MockProvider,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Spawn the mock identity provider
        let provider = MockProvider::default();
        let provider_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind provider");
        let provider_addr = provider_listener.local_addr().unwrap();
        let provider_app = provider.router();
        tokio::spawn(async move {
            axum::serve(provider_listener, provider_app).await.unwrap();
        });

        let identity = Arc::new(
            IdentityVerifier::new(
                &format!("http://{}", provider_addr),
                Duration::from_secs(2),
            )
            .expect("Failed to init verifier"),
        );

        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            provider_url: format!("http://{}", provider_addr),
            provider_timeout: Duration::from_secs(2),
            registry_floor: 2,
            log_level: "warn".to_string(),
        };

        let sessions = SessionStore::new();
        let state = AppState {
            repo: Arc::clone(&repo),
            sessions: sessions.clone(),
            identity,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            repo,
            sessions,
            provider,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register an identity with the provider and a local account at `level`.
    async fn seed_account(&self, canonical_name: &str, level: i64) {
        self.provider.add_identity(canonical_name);
        let identity = ExternalIdentity {
            name: canonical_name.to_string(),
            avatar_url: None,
            created_utc: 1_600_000_000,
        };
        self.repo
            .create_account(&identity, level, &json!({}))
            .await
            .expect("Failed to seed account");
    }

    /// Create a fully authenticated session for a seeded identity.
    fn session_for(&self, name: &str) -> String {
        let access_token = self.provider.issue_token(name);
        self.sessions.create(Some(access_token))
    }

    fn api_client(&self, session: &str) -> ApiClient {
        ApiClient::new(&self.base_url).with_session(session)
    }
}

async fn error_code(resp: reqwest::Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_create_user_level_boundary() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("admin", 3).await;
    fixture.provider.add_identity("newbie");
    let session = fixture.session_for("admin");

    // Equal level must deny
    let resp = fixture
        .client
        .post(fixture.url("/api/user"))
        .bearer_auth(&session)
        .json(&json!({"externalId": "newbie", "level": 3}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(error_code(resp).await, codes::FORBIDDEN);

    // Higher level must deny
    let resp = fixture
        .client
        .post(fixture.url("/api/user"))
        .bearer_auth(&session)
        .json(&json!({"externalId": "newbie", "level": 4}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Strictly lower level succeeds
    let resp = fixture
        .client
        .post(fixture.url("/api/user"))
        .bearer_auth(&session)
        .json(&json!({"externalId": "newbie", "level": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["externalId"], "newbie");
    assert_eq!(body["data"]["level"], 2);
}

#[tokio::test]
async fn test_create_user_duplicate_conflicts() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("admin", 4).await;
    fixture.seed_account("existing", 1).await;
    let session = fixture.session_for("admin");

    let resp = fixture
        .client
        .post(fixture.url("/api/user"))
        .bearer_auth(&session)
        .json(&json!({"externalId": "existing", "level": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    assert_eq!(error_code(resp).await, codes::CONFLICT);

    // Same conflict for a differently-cased duplicate
    let resp = fixture
        .client
        .post(fixture.url("/api/user"))
        .bearer_auth(&session)
        .json(&json!({"externalId": "EXISTING", "level": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_create_user_canonicalizes_casing() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("admin", 4).await;
    fixture.provider.add_identity("foobar");
    let session = fixture.session_for("admin");

    let resp = fixture
        .client
        .post(fixture.url("/api/user"))
        .bearer_auth(&session)
        .json(&json!({"externalId": "FooBar", "level": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["externalId"], "foobar");

    let stored = fixture.repo.get_account("FooBar").await.unwrap().unwrap();
    assert_eq!(stored.external_id, "foobar");
}

#[tokio::test]
async fn test_create_user_unknown_identity() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("admin", 4).await;
    let session = fixture.session_for("admin");

    let resp = fixture
        .client
        .post(fixture.url("/api/user"))
        .bearer_auth(&session)
        .json(&json!({"externalId": "nobody", "level": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(error_code(resp).await, codes::UNKNOWN_IDENTITY);
}

#[tokio::test]
async fn test_delete_user_level_rule_and_cascade() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("mod", 3).await;
    fixture.seed_account("peer", 3).await;
    fixture.seed_account("member", 1).await;
    let session = fixture.session_for("mod");

    fixture.repo.create_vote("member", "cat-1").await.unwrap();
    fixture.repo.create_vote("member", "cat-2").await.unwrap();

    // Equal level must deny
    let resp = fixture
        .client
        .delete(fixture.url("/api/user/peer"))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Unknown target is not found
    let resp = fixture
        .client
        .delete(fixture.url("/api/user/ghost"))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(error_code(resp).await, codes::NOT_FOUND);

    // Lower level succeeds and cascades to votes
    let resp = fixture
        .client
        .delete(fixture.url("/api/user/member"))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    assert!(fixture.repo.get_account("member").await.unwrap().is_none());
    let votes = fixture.repo.list_votes_for_account("member").await.unwrap();
    assert!(votes.is_empty());
}

#[tokio::test]
async fn test_me_without_token_skips_provider() {
    let fixture = TestFixture::new().await;

    // Session exists but the OAuth exchange never completed
    let session = fixture.sessions.create(None);

    let resp = fixture
        .client
        .get(fixture.url("/api/me"))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(error_code(resp).await, codes::UNAUTHENTICATED);
    assert_eq!(fixture.provider.hit_count(), 0);
}

#[tokio::test]
async fn test_me_merged_view_and_absence() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("alice", 2).await;
    let session = fixture.session_for("alice");

    let resp = fixture
        .client
        .get(fixture.url("/api/me"))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["identity"]["name"], "alice");
    assert_eq!(body["data"]["level"], 2);

    // A verified identity without a local account is a plain not-found
    fixture.provider.add_identity("stranger");
    let session = fixture.session_for("stranger");

    let resp = fixture
        .client
        .get(fixture.url("/api/me"))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(error_code(resp).await, codes::NOT_FOUND);
}

#[tokio::test]
async fn test_self_deregister() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("leaver", 1).await;
    let session = fixture.session_for("leaver");

    fixture.repo.create_vote("leaver", "cat-1").await.unwrap();

    let resp = fixture
        .client
        .post(fixture.url("/api/user/deleteaccount"))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    assert!(fixture.repo.get_account("leaver").await.unwrap().is_none());
    let votes = fixture.repo.list_votes_for_account("leaver").await.unwrap();
    assert!(votes.is_empty());

    // The session died with the account
    let resp = fixture
        .client
        .get(fixture.url("/api/me"))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_registry_floor() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("voter", 1).await;
    fixture.seed_account("host", 2).await;

    // Below the floor
    let session = fixture.session_for("voter");
    let resp = fixture
        .client
        .post(fixture.url("/api/category"))
        .bearer_auth(&session)
        .json(&json!({"name": "Best Drama", "group": "main"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // At the floor
    let session = fixture.session_for("host");
    let resp = fixture
        .client
        .post(fixture.url("/api/category"))
        .bearer_auth(&session)
        .json(&json!({"name": "Best Drama", "group": "main"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // No session at all
    let resp = fixture
        .client
        .post(fixture.url("/api/category"))
        .json(&json!({"name": "Best Comedy", "group": "main"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_category_update_and_race_to_not_found() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("host", 2).await;
    let session = fixture.session_for("host");

    let created = fixture
        .repo
        .create_category(&CreateCategoryRequest {
            name: "Old Name".to_string(),
            group: "main".to_string(),
            position: 1,
        })
        .await
        .unwrap();

    // Partial patch returns the full resulting entity
    let resp = fixture
        .client
        .patch(fixture.url(&format!("/api/category/{}", created.id)))
        .bearer_auth(&session)
        .json(&json!({"name": "New Name"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "New Name");
    assert_eq!(body["data"]["group"], "main");
    assert_eq!(body["data"]["position"], 1);

    // One of two racing deletes must observe not-found
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/category/{}", created.id)))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/category/{}", created.id)))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_voting_categories_by_group() {
    let fixture = TestFixture::new().await;

    for (name, group, position) in [
        ("Best Drama", "main", 2),
        ("Best Comedy", "main", 1),
        ("Best OP", "music", 1),
    ] {
        fixture
            .repo
            .create_category(&CreateCategoryRequest {
                name: name.to_string(),
                group: group.to_string(),
                position,
            })
            .await
            .unwrap();
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/categories/main"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let cats = body["data"].as_array().unwrap();
    assert_eq!(cats.len(), 2);
    assert_eq!(cats[0]["name"], "Best Comedy");
    assert_eq!(cats[1]["name"], "Best Drama");
    assert!(cats[0].get("group").is_none());
}

#[tokio::test]
async fn test_client_update_category_splices_in_place() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("host", 2).await;
    let session = fixture.session_for("host");
    let api = fixture.api_client(&session);

    let mut ids = Vec::new();
    for name in ["First", "Middle", "Last"] {
        let cat = fixture
            .repo
            .create_category(&CreateCategoryRequest {
                name: name.to_string(),
                group: "main".to_string(),
                position: ids.len() as i64,
            })
            .await
            .unwrap();
        ids.push(cat.id);
    }

    let mut state = CacheState::default();
    api.get_categories(&mut state).await.unwrap();

    api.update_category(
        &mut state,
        &ids[1],
        &UpdateCategoryRequest {
            name: Some("Renamed".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let categories = state.categories.as_ref().unwrap();
    assert_eq!(categories.len(), 3);
    assert_eq!(categories[0].name, "First");
    assert_eq!(categories[1].name, "Renamed");
    assert_eq!(categories[1].id, ids[1]);
    assert_eq!(categories[2].name, "Last");
}

#[tokio::test]
async fn test_client_failed_update_leaves_cache_unchanged() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("host", 2).await;
    let session = fixture.session_for("host");
    let api = fixture.api_client(&session);

    fixture
        .repo
        .create_category(&CreateCategoryRequest {
            name: "Only".to_string(),
            group: "main".to_string(),
            position: 0,
        })
        .await
        .unwrap();

    let mut state = CacheState::default();
    api.get_categories(&mut state).await.unwrap();
    let snapshot = state.clone();

    let err = api
        .update_category(
            &mut state,
            "no-such-id",
            &UpdateCategoryRequest {
                name: Some("X".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_code(codes::NOT_FOUND));
    assert_eq!(state, snapshot);
}

#[tokio::test]
async fn test_client_theme_mutations_replace_collection() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("host", 2).await;
    let session = fixture.session_for("host");
    let api = fixture.api_client(&session);

    let mut state = CacheState::default();

    api.create_theme(
        &mut state,
        &CreateThemeRequest {
            theme_type: "dark".to_string(),
            name: "Midnight".to_string(),
            config: Some(json!({"accent": "#123456"})),
        },
    )
    .await
    .unwrap();

    let themes = state.themes.as_ref().unwrap();
    assert_eq!(themes.len(), 1);
    assert_eq!(themes[0].theme_type, "dark");

    // The delete response carries the whole (now empty) collection
    api.delete_themes(&mut state, "dark").await.unwrap();
    assert_eq!(state.themes, Some(vec![]));
}

#[tokio::test]
async fn test_client_user_flow() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("admin", 4).await;
    fixture.provider.add_identity("recruit");
    let session = fixture.session_for("admin");
    let api = fixture.api_client(&session);

    let mut state = CacheState::default();
    api.get_users(&mut state).await.unwrap();
    assert_eq!(state.users.as_ref().unwrap().len(), 1);

    api.add_user(
        &mut state,
        &CreateAccountRequest {
            external_id: "Recruit".to_string(),
            level: 1,
            flags: json!({}),
        },
    )
    .await
    .unwrap();

    let users = state.users.as_ref().unwrap();
    assert_eq!(users.len(), 2);
    // The cache holds the canonical casing the server confirmed
    assert_eq!(users[1].external_id, "recruit");

    api.remove_user(&mut state, "recruit").await.unwrap();
    assert_eq!(state.users.as_ref().unwrap().len(), 1);
}

#[tokio::test]
async fn test_client_forbidden_add_aborts_without_cache_write() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("host", 2).await;
    fixture.provider.add_identity("peer");
    let session = fixture.session_for("host");
    let api = fixture.api_client(&session);

    let mut state = CacheState::default();
    api.get_users(&mut state).await.unwrap();
    let snapshot = state.clone();

    let err = api
        .add_user(
            &mut state,
            &CreateAccountRequest {
                external_id: "peer".to_string(),
                level: 2,
                flags: json!({}),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_code(codes::FORBIDDEN));
    assert_eq!(state, snapshot);
}

#[tokio::test]
async fn test_session_gate() {
    let fixture = TestFixture::new().await;
    fixture.seed_account("voter", 1).await;

    // Unprotected paths never consult the server
    let api = ApiClient::new(&fixture.base_url);
    let mut state = CacheState::default();
    let outcome = api.guard(&mut state, "/about").await.unwrap();
    assert_eq!(outcome, GateOutcome::Proceed);
    assert_eq!(fixture.provider.hit_count(), 0);

    // Protected path without any session redirects to login
    let outcome = api.guard(&mut state, "/vote/main").await.unwrap();
    assert!(matches!(outcome, GateOutcome::Login(_)));
    assert!(state.me.is_none());

    // With a live session the identity loads and navigation proceeds
    let session = fixture.session_for("voter");
    let api = fixture.api_client(&session);
    let mut state = CacheState::default();
    let outcome = api.guard(&mut state, "/vote/main").await.unwrap();
    assert_eq!(outcome, GateOutcome::Proceed);
    assert_eq!(state.me.as_ref().unwrap().identity.name, "voter");
}

#[tokio::test]
async fn test_session_bootstrap_routes() {
    let fixture = TestFixture::new().await;
    fixture.provider.add_identity("alice");
    let access_token = fixture.provider.issue_token("alice");

    // A bogus access token is rejected at exchange time
    let resp = fixture
        .client
        .post(fixture.url("/auth/session"))
        .json(&json!({"accessToken": "forged"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // A real one yields a session token
    let resp = fixture
        .client
        .post(fixture.url("/auth/session"))
        .json(&json!({"accessToken": access_token}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let session = body["data"]["sessionToken"].as_str().unwrap().to_string();

    // Logout invalidates it
    let resp = fixture
        .client
        .delete(fixture.url("/auth/session"))
        .bearer_auth(&session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert!(fixture.sessions.get(&session).is_none());
}
