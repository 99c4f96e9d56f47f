//! Integration tests for the file-backed credential store

use super::*;
use auth_gateway::{
    CredentialPair, CredentialStore, FileCredentialStore, GatewayClient, NoOpSessionListener,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use wiremock::ResponseTemplate;

#[tokio::test]
async fn test_renewed_credentials_survive_reload() {
    let mock_server = setup_mock_server().await;
    mount_protected(&mock_server, "/courses").await;
    refresh_mock()
        .respond_with(success_response(renewed_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("session").join("credentials.json");

    let client = GatewayClient::with_store(
        config_for(&mock_server),
        FileCredentialStore::new(&file),
        Arc::new(NoOpSessionListener),
    )
    .expect("Failed to build client");
    client
        .login(&CredentialPair::new(OLD_ACCESS, OLD_REFRESH, 900))
        .await
        .unwrap();

    let response = client.get("/courses").await.unwrap();
    assert_eq!(response.status, 200);

    // A second process reading the same file sees the rotated pair.
    let reopened = FileCredentialStore::new(&file);
    let stored = reopened.load().await.unwrap();
    assert_eq!(stored.access_token().expose_secret(), NEW_ACCESS);
    assert_eq!(stored.refresh_token().expose_secret(), NEW_REFRESH);
    assert!(stored.expires_at.is_some());

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(raw["accessToken"], NEW_ACCESS);
    assert_eq!(raw["refreshToken"], NEW_REFRESH);
}

#[tokio::test]
async fn test_failed_renewal_removes_credential_file() {
    let mock_server = setup_mock_server().await;
    mount_protected(&mock_server, "/courses").await;
    refresh_mock()
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("credentials.json");

    let client = GatewayClient::with_store(
        config_for(&mock_server),
        FileCredentialStore::new(&file),
        Arc::new(NoOpSessionListener),
    )
    .expect("Failed to build client");
    client
        .login(&CredentialPair::new(OLD_ACCESS, OLD_REFRESH, 900))
        .await
        .unwrap();
    assert!(file.exists());

    let result = client.get("/courses").await;

    assert!(result.unwrap_err().is_session_terminal());
    assert!(!file.exists());
    assert!(!client.is_authenticated().await);
}
