//! Shared helpers for auth integration tests.

use chrono::{Duration, Utc};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use liftsync_auth::{AuthConfig, OAuthRefreshClient};
use liftsync_common::{Secret, StoredCredential, UserId};

pub fn user() -> UserId {
    UserId::new("lifter@example.com").unwrap()
}

pub fn credential(access: &str, expires_in: Duration, refresh: Option<&str>) -> StoredCredential {
    StoredCredential::new(
        user(),
        access,
        refresh.map(Secret::from),
        Utc::now() + expires_in,
    )
}

/// Refresh client pointed at `{server}/token`.
pub fn refresh_client(server: &MockServer) -> OAuthRefreshClient {
    let config = AuthConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        token_url: format!("{}/token", server.uri()),
        ..Default::default()
    };
    OAuthRefreshClient::new(&config).expect("Failed to build refresh client")
}

/// Mounts a token endpoint that accepts a refresh grant.
pub async fn mount_token_success(server: &MockServer, access_token: &str, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": expires_in
        })))
        .mount(server)
        .await;
}

/// Mounts a token endpoint that rejects the refresh token.
pub async fn mount_token_rejected(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(server)
        .await;
}
