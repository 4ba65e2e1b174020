use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::session::*;
use shared_backend::BackendClient;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn session_for(user: &TestUser, access_token: &str) -> AuthSession {
    AuthSession {
        access_token: access_token.to_string(),
        refresh_token: Some("refresh-1".to_string()),
        user: user.to_user(),
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}

#[tokio::test]
async fn test_hydrate_from_file_store() {
    let dir = tempdir().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path().join("session.json")));
    let user = TestUser::admin("admin@clinic.test");

    store.save(&session_for(&user, "access-1")).await.unwrap();

    let context = AuthContext::hydrate(store).await.unwrap();
    assert!(context.is_authenticated().await);
    assert_eq!(context.access_token().await.as_deref(), Some("access-1"));
    assert_eq!(context.current_user().await.unwrap().id, user.id);
}

#[tokio::test]
async fn test_missing_file_starts_signed_out() {
    let dir = tempdir().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path().join("nested").join("session.json")));

    let context = AuthContext::hydrate(store.clone()).await.unwrap();
    assert!(!context.is_authenticated().await);
    assert!(context.current_user().await.is_none());

    // saving creates the parent directory
    context.set_session(session_for(&TestUser::default(), "access-2")).await.unwrap();
    assert!(store.path().exists());
}

#[tokio::test]
async fn test_clear_removes_persisted_session() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("session.json");
    let store = Arc::new(FileSessionStore::new(&file));

    let context = AuthContext::hydrate(store.clone()).await.unwrap();
    context.set_session(session_for(&TestUser::default(), "access-3")).await.unwrap();
    assert!(file.exists());

    context.clear().await.unwrap();
    assert!(!file.exists());
    assert!(!context.is_authenticated().await);

    // a fresh context sees nothing and clearing again is harmless
    let rehydrated = AuthContext::hydrate(store).await.unwrap();
    assert!(rehydrated.current_user().await.is_none());
    rehydrated.clear().await.unwrap();
}

#[tokio::test]
async fn test_corrupt_file_is_discarded() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("session.json");
    std::fs::write(&file, "{ not json").unwrap();

    let context = AuthContext::hydrate(Arc::new(FileSessionStore::new(&file))).await.unwrap();
    assert!(!context.is_authenticated().await);
    assert!(!file.exists());
}

#[tokio::test]
async fn test_refresh_replaces_and_persists_session() {
    let server = MockServer::start().await;
    let config = TestConfig::with_backend(&server.uri());
    let user = TestUser::doctor("doctor@clinic.test");
    let new_token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(2));

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": new_token,
            "refreshToken": "refresh-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path().join("session.json")));
    let context = AuthContext::hydrate(store.clone()).await.unwrap();
    context.set_session(session_for(&user, "old-token")).await.unwrap();

    let client = BackendClient::new(&config.to_app_config());
    let refreshed = context.refresh(&client).await.unwrap();

    assert_eq!(refreshed.access_token, new_token);
    assert_eq!(refreshed.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(refreshed.user.id, user.id);
    // expiry comes from the token's exp claim when the response omits it
    let expires_at = refreshed.expires_at.unwrap();
    assert!(expires_at > Utc::now() + Duration::minutes(90));

    let persisted = store.load().await.unwrap().unwrap();
    assert_eq!(persisted, refreshed);
}

#[tokio::test]
async fn test_rejected_refresh_keeps_old_session() {
    let server = MockServer::start().await;
    let config = TestConfig::with_backend(&server.uri());

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Refresh token revoked" })))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let context = AuthContext::hydrate(store).await.unwrap();
    context.set_session(session_for(&TestUser::default(), "old-token")).await.unwrap();

    let client = BackendClient::new(&config.to_app_config());
    let result = context.refresh(&client).await;

    assert_matches!(result, Err(AuthError::RefreshRejected { status: 401, ref message }) if message == "Refresh token revoked");
    assert_eq!(context.access_token().await.as_deref(), Some("old-token"));
}

#[tokio::test]
async fn test_refresh_requires_refresh_token() {
    let context = AuthContext::hydrate(Arc::new(MemorySessionStore::new())).await.unwrap();
    let mut session = session_for(&TestUser::default(), "access");
    session.refresh_token = None;
    context.set_session(session).await.unwrap();

    let client = BackendClient::new(&TestConfig::default().to_app_config());
    assert_matches!(context.refresh(&client).await, Err(AuthError::NoRefreshToken));
}

#[tokio::test]
async fn test_store_path_from_config() {
    let dir = tempdir().unwrap();
    let config = shared_config::AppConfig {
        session_store_path: dir.path().join("console-session.json"),
        ..Default::default()
    };

    let store = FileSessionStore::from_config(&config);
    assert_eq!(store.path(), dir.path().join("console-session.json"));
    assert!(store.load().await.unwrap().is_none());
}
