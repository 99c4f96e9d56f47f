//! Integration tests using WireMock
//!
//! These tests drive the gateway over real HTTP against a mock backend that
//! accepts one access credential, rejects the previous one with 401, and
//! exposes the renewal endpoint.

pub mod file_store;
pub mod renewal;

use auth_gateway::{gateway_config, GatewayConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Access credential issued at login.
pub const OLD_ACCESS: &str = "access-1";
/// Refresh credential issued at login.
pub const OLD_REFRESH: &str = "refresh-1";
/// Access credential issued by renewal.
pub const NEW_ACCESS: &str = "access-2";
/// Refresh credential issued by renewal.
pub const NEW_REFRESH: &str = "refresh-2";

/// Helper to create a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Gateway configuration pointing at the mock server.
pub fn config_for(server: &MockServer) -> GatewayConfig {
    gateway_config()
        .base_url(server.uri())
        .timeout(Duration::from_secs(5))
        .build()
        .expect("valid configuration")
}

/// Mount a GET endpoint that only accepts the renewed credential.
pub async fn mount_protected(server: &MockServer, endpoint: &str) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(header("Authorization", format!("Bearer {}", NEW_ACCESS).as_str()))
        .respond_with(success_response(json!({ "items": [] })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;
}

/// Renewal endpoint matcher for the login refresh credential.
pub fn refresh_mock() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": OLD_REFRESH })))
}

/// Successful renewal body.
pub fn renewed_body() -> serde_json::Value {
    json!({
        "accessToken": NEW_ACCESS,
        "refreshToken": NEW_REFRESH,
        "expiresIn": 900
    })
}

/// Successful renewal, held back long enough for concurrent callers to queue.
pub fn delayed_renewal() -> ResponseTemplate {
    success_response(renewed_body()).set_delay(Duration::from_millis(200))
}

/// Helper to create success response templates
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}
