use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use secrecy::ExposeSecret;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use onshape_client::auth::{
    AuthProvider, OAuthAuthProvider, OAuthCredentials, QueryParams, TokenPair,
    TokenRefreshListener,
};
use onshape_client::rest::OnshapeClient;
use onshape_client::rest::documents::DocumentsQuery;
use onshape_client::{AuthMethod, ClientConfig, OnshapeError};

const TOKEN_PATH: &str = "/oauth/token";

fn oauth_provider(server: &MockServer) -> OAuthAuthProvider {
    OAuthAuthProvider::new(
        OAuthCredentials::new("old-token")
            .with_refresh_token("refresh-1")
            .with_client("client-id", "client-secret"),
    )
    .unwrap()
    .with_token_url(format!("{}{TOKEN_PATH}", server.uri()))
}

fn build_client(server: &MockServer, provider: OAuthAuthProvider) -> OnshapeClient {
    OnshapeClient::builder()
        .base_url(server.uri())
        .provider(provider)
        .build()
        .unwrap()
}

fn oauth(client: &OnshapeClient) -> &OAuthAuthProvider {
    client.auth_provider().as_oauth().unwrap()
}

async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .and(body_string_contains("client_id=client-id"))
        .and(body_string_contains("client_secret=client-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "new-token",
            "refresh_token": "refresh-2",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_documents(server: &MockServer, token: &str, status: u16, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/documents"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(serde_json::json!({ "items": [] }))
                .set_delay(Duration::from_millis(20)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_bearer_header_sent() {
    let server = MockServer::start().await;
    mount_documents(&server, "old-token", 200, 1).await;
    mount_token_endpoint(&server, 0).await;

    let client = build_client(&server, oauth_provider(&server));
    assert_eq!(client.auth_method(), AuthMethod::OAuth);
    client.list_documents(&Default::default()).await.unwrap();
}

#[tokio::test]
async fn test_refresh_then_retry_once_on_401() {
    let server = MockServer::start().await;
    mount_documents(&server, "old-token", 401, 1).await;
    mount_documents(&server, "new-token", 200, 1).await;
    mount_token_endpoint(&server, 1).await;

    let client = build_client(&server, oauth_provider(&server));
    let documents = client.list_documents(&Default::default()).await.unwrap();
    assert!(documents.items.is_empty());

    let store = oauth(&client).store();
    assert_eq!(store.access_token().expose_secret(), "new-token");
    assert_eq!(store.refresh_token().unwrap().expose_secret(), "refresh-2");
    assert_eq!(store.generation(), 1);
    assert!(store.snapshot().expires_at.is_some());
}

#[tokio::test]
async fn test_second_401_surfaces_without_third_attempt() {
    let server = MockServer::start().await;
    mount_documents(&server, "old-token", 401, 1).await;
    mount_documents(&server, "new-token", 401, 1).await;
    mount_token_endpoint(&server, 1).await;

    let client = build_client(&server, oauth_provider(&server));
    let err = client.list_documents(&Default::default()).await.unwrap_err();

    assert!(err.is_authentication());
    assert_eq!(err.status(), Some(401));
    assert!(err.hints().iter().any(|h| h.contains("again after a successful refresh")));
}

#[tokio::test]
async fn test_concurrent_401s_trigger_single_refresh() {
    let server = MockServer::start().await;
    mount_documents(&server, "old-token", 401, 8).await;
    mount_documents(&server, "new-token", 200, 8).await;
    mount_token_endpoint(&server, 1).await;

    let client = build_client(&server, oauth_provider(&server));
    let query = DocumentsQuery::default();
    let results = join_all((0..8).map(|_| client.list_documents(&query))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(oauth(&client).store().generation(), 1);
}

#[tokio::test]
async fn test_concurrent_refresh_calls_share_one_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": "new-token" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = oauth_provider(&server);
    let results = join_all((0..5).map(|_| provider.refresh())).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(provider.store().generation(), 1);
    // No refresh token in the response keeps the old one.
    assert_eq!(
        provider.store().refresh_token().unwrap().expose_secret(),
        "refresh-1"
    );
}

#[tokio::test]
async fn test_failed_refresh_leaves_store_unchanged() {
    let server = MockServer::start().await;
    mount_documents(&server, "old-token", 401, 1).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Refresh token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server, oauth_provider(&server));
    let err = client.list_documents(&Default::default()).await.unwrap_err();

    match err {
        OnshapeError::Authentication { status, message, .. } => {
            assert_eq!(status, Some(400));
            assert_eq!(message, "invalid_grant: Refresh token expired");
        }
        other => panic!("expected authentication error, got {other:?}"),
    }
    let store = oauth(&client).store();
    assert_eq!(store.access_token().expose_secret(), "old-token");
    assert_eq!(store.refresh_token().unwrap().expose_secret(), "refresh-1");
    assert_eq!(store.generation(), 0);
}

#[tokio::test]
async fn test_401_without_refresh_capability_is_not_retried() {
    let server = MockServer::start().await;
    mount_documents(&server, "old-token", 401, 1).await;
    mount_token_endpoint(&server, 0).await;

    let provider = OAuthAuthProvider::new(OAuthCredentials::new("old-token"))
        .unwrap()
        .with_token_url(format!("{}{TOKEN_PATH}", server.uri()));
    let client = build_client(&server, provider);
    let err = client.list_documents(&Default::default()).await.unwrap_err();

    assert!(err.is_authentication());
    assert!(err.hints().iter().any(|h| h.contains("cannot be refreshed")));
}

#[tokio::test]
async fn test_timed_out_refresh_releases_guard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": "slow-token" }))
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 1).await;

    let provider = oauth_provider(&server).with_refresh_timeout(Duration::from_millis(100));

    let err = provider.refresh().await.unwrap_err();
    assert!(matches!(err, OnshapeError::Timeout));
    assert_eq!(provider.store().access_token().expose_secret(), "old-token");

    provider.refresh().await.unwrap();
    assert_eq!(provider.store().access_token().expose_secret(), "new-token");
}

#[tokio::test]
async fn test_expiring_token_refreshed_before_sending() {
    let server = MockServer::start().await;
    mount_documents(&server, "old-token", 401, 0).await;
    mount_documents(&server, "new-token", 200, 1).await;
    mount_token_endpoint(&server, 1).await;

    let provider = oauth_provider(&server)
        .with_expires_at(time::OffsetDateTime::now_utc() + time::Duration::seconds(10));
    let client = build_client(&server, provider);
    client.list_documents(&Default::default()).await.unwrap();
}

#[derive(Default)]
struct RecordingListener {
    access_tokens: Mutex<Vec<String>>,
}

impl TokenRefreshListener for RecordingListener {
    fn on_tokens_refreshed(&self, tokens: &TokenPair) {
        self.access_tokens
            .lock()
            .unwrap()
            .push(tokens.access_token.expose_secret().to_string());
    }
}

#[tokio::test]
async fn test_listener_receives_rotated_tokens() {
    let server = MockServer::start().await;
    mount_documents(&server, "old-token", 401, 1).await;
    mount_documents(&server, "new-token", 200, 1).await;
    mount_token_endpoint(&server, 1).await;

    let listener = Arc::new(RecordingListener::default());
    let config = ClientConfig::new()
        .access_token("old-token")
        .refresh_token("refresh-1")
        .oauth_client("client-id", "client-secret")
        .token_url(format!("{}{TOKEN_PATH}", server.uri()))
        .base_url(server.uri());
    let client = OnshapeClient::builder()
        .config(config)
        .token_refresh_listener(listener.clone())
        .build()
        .unwrap();

    let _: serde_json::Value = client
        .get_json("/api/documents", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(*listener.access_tokens.lock().unwrap(), vec!["new-token".to_string()]);
    assert!(matches!(client.auth_provider(), AuthProvider::OAuth(_)));
}

async fn mount_rejecting_token_endpoint(server: &MockServer, delay: Duration, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({
                    "error": "invalid_grant",
                    "error_description": "Refresh token revoked"
                }))
                .set_delay(delay),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_401s_share_one_failed_refresh() {
    let server = MockServer::start().await;
    mount_documents(&server, "old-token", 401, 8).await;
    mount_rejecting_token_endpoint(&server, Duration::from_millis(300), 1).await;

    let client = build_client(&server, oauth_provider(&server));
    let query = DocumentsQuery::default();
    let results = join_all((0..8).map(|_| client.list_documents(&query))).await;

    for result in results {
        match result {
            Err(OnshapeError::Authentication { status, message, .. }) => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "invalid_grant: Refresh token revoked");
            }
            other => panic!("expected authentication error, got {other:?}"),
        }
    }
    assert_eq!(oauth(&client).store().generation(), 0);
}

#[tokio::test]
async fn test_later_refresh_retries_after_failure() {
    let server = MockServer::start().await;
    mount_rejecting_token_endpoint(&server, Duration::ZERO, 2).await;

    let provider = oauth_provider(&server);
    assert!(provider.refresh().await.unwrap_err().is_authentication());
    assert!(provider.refresh().await.unwrap_err().is_authentication());
    assert_eq!(provider.store().access_token().expose_secret(), "old-token");
}

#[tokio::test]
async fn test_out_of_range_expiry_is_treated_as_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "new-token",
            "expires_in": i64::MAX
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = oauth_provider(&server);
    provider.refresh().await.unwrap();

    let state = provider.store().snapshot();
    assert_eq!(state.generation, 1);
    assert_eq!(state.access_token.expose_secret(), "new-token");
    assert!(state.expires_at.is_none());
}
