//! Integration tests for single-flight renewal and replay

use super::*;
use auth_gateway::{
    CredentialPair, CredentialStore, GatewayClient, GatewayError, InMemoryCredentialStore, InvalidationReason,
    MockSessionListener, RenewalPhase, SessionError, SessionInvalidated, SessionListener,
};
use mockall::mock;
use secrecy::ExposeSecret;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mock! {
    pub Listener {}

    impl SessionListener for Listener {
        fn on_session_invalidated(&self, event: &SessionInvalidated);
    }
}

async fn logged_in_client(
    server: &wiremock::MockServer,
    listener: Arc<dyn SessionListener>,
) -> GatewayClient<auth_gateway::ReqwestHttpTransport, InMemoryCredentialStore> {
    let client =
        GatewayClient::with_store(config_for(server), InMemoryCredentialStore::new(), listener)
            .expect("Failed to build client");
    client
        .login(&CredentialPair::new(OLD_ACCESS, OLD_REFRESH, 900))
        .await
        .expect("login");
    client
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_expiry_triggers_one_renewal() {
    let mock_server = setup_mock_server().await;
    mount_protected(&mock_server, "/courses").await;
    refresh_mock()
        .respond_with(delayed_renewal())
        .expect(1)
        .mount(&mock_server)
        .await;

    let listener = Arc::new(MockSessionListener::new());
    let client = logged_in_client(&mock_server, listener.clone()).await;

    let requests = (0..5).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.get("/courses").await })
    });
    let results = futures::future::join_all(requests).await;

    for result in results {
        let response = result.unwrap().expect("request should succeed after renewal");
        assert_eq!(response.status, 200);
    }

    let stored = client.store().load().await.unwrap();
    assert_eq!(stored.access_token().expose_secret(), NEW_ACCESS);
    assert_eq!(stored.refresh_token().expose_secret(), NEW_REFRESH);
    assert_eq!(client.renewal_phase(), RenewalPhase::Idle);
    assert_eq!(listener.count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rejected_renewal_ends_session_once() {
    let mock_server = setup_mock_server().await;
    mount_protected(&mock_server, "/courses").await;
    refresh_mock()
        .respond_with(ResponseTemplate::new(401).set_delay(std::time::Duration::from_millis(200)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut listener = MockListener::new();
    listener
        .expect_on_session_invalidated()
        .withf(|event| matches!(event.reason, InvalidationReason::RenewalFailed(_)))
        .times(1)
        .return_const(());
    let client = logged_in_client(&mock_server, Arc::new(listener)).await;

    let requests = (0..5).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.get("/courses").await })
    });
    let results = futures::future::join_all(requests).await;

    for result in results {
        let error = result.unwrap().unwrap_err();
        assert!(error.is_session_terminal());
        assert!(error.needs_reauth());
    }
    assert!(!client.is_authenticated().await);
    assert_eq!(client.renewal_phase(), RenewalPhase::Idle);
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_skips_renewal() {
    let mock_server = setup_mock_server().await;
    mount_protected(&mock_server, "/courses").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(success_response(renewed_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let listener = Arc::new(MockSessionListener::new());
    let client = GatewayClient::with_store(
        config_for(&mock_server),
        InMemoryCredentialStore::new(),
        listener.clone(),
    )
    .expect("Failed to build client");

    let result = client.get("/courses").await;

    assert_eq!(
        result.unwrap_err(),
        GatewayError::Session(SessionError::NoRefreshToken)
    );
    assert_eq!(listener.count(), 1);
    assert_eq!(
        listener.get_events()[0].reason,
        InvalidationReason::MissingRefreshToken
    );
}

#[tokio::test]
async fn test_non_auth_failures_are_not_retried() {
    let mock_server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/courses"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(serde_json::json!({ "title": "required" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    refresh_mock()
        .respond_with(success_response(renewed_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let listener = Arc::new(MockSessionListener::new());
    let client = logged_in_client(&mock_server, listener.clone()).await;

    let server_error = client.get("/courses").await.unwrap();
    let validation = client
        .post_json("/courses", &serde_json::json!({}))
        .await
        .unwrap();

    assert_eq!(server_error.status, 500);
    assert_eq!(validation.status, 422);
    assert_eq!(
        validation.json::<serde_json::Value>().unwrap()["title"],
        "required"
    );
    assert!(client.is_authenticated().await);
    assert_eq!(listener.count(), 0);
}

#[tokio::test]
async fn test_second_rejection_after_replay_is_terminal() {
    let mock_server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/enrollments"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&mock_server)
        .await;
    refresh_mock()
        .respond_with(success_response(renewed_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let listener = Arc::new(MockSessionListener::new());
    let client = logged_in_client(&mock_server, listener.clone()).await;

    let result = client.get("/enrollments").await;

    assert_eq!(
        result.unwrap_err(),
        GatewayError::Session(SessionError::ReplayUnauthorized)
    );
    assert!(!client.is_authenticated().await);
    assert_eq!(listener.count(), 1);
    assert_eq!(
        listener.get_events()[0].reason,
        InvalidationReason::ReplayRejected
    );
}

#[tokio::test]
async fn test_logout_does_not_signal() {
    let mock_server = setup_mock_server().await;

    let mut listener = MockListener::new();
    listener.expect_on_session_invalidated().times(0);
    let client = logged_in_client(&mock_server, Arc::new(listener)).await;

    client.logout().await;

    assert!(!client.is_authenticated().await);
}
