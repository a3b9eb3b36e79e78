//! Full lifecycle: local cache, HTTP vault and a real refresh grant.

use chrono::Duration;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use liftsync_auth::{CredentialTier, HttpTokenVault, TokenCache, TokenLifecycleManager};
use liftsync_common::{Error, Secret};
use liftsync_store::LocalStore;

use crate::common;

fn manager(
    store: Arc<LocalStore>,
    vault: HttpTokenVault,
    server: &MockServer,
) -> TokenLifecycleManager {
    let tiers: Vec<Arc<dyn CredentialTier>> =
        vec![Arc::new(TokenCache::new(store)), Arc::new(vault)];
    TokenLifecycleManager::new(
        tiers,
        Arc::new(common::refresh_client(server)),
        Duration::minutes(5),
    )
}

#[tokio::test]
async fn test_expired_cache_refreshes_and_mirrors_to_vault() {
    let server = MockServer::start().await;
    common::mount_token_success(&server, "refreshed", 3600).await;
    Mock::given(method("PUT"))
        .and(path("/vault/credentials/lifter@example.com"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(LocalStore::in_memory().unwrap());
    store
        .put_credential(&common::credential("expired", Duration::seconds(-1), Some("r1")))
        .unwrap();
    let vault = HttpTokenVault::new(&format!("{}/vault", server.uri())).unwrap();
    let manager = manager(store.clone(), vault, &server);

    let token = manager
        .get_valid_access_token(&common::user())
        .await
        .unwrap();
    assert_eq!(token, Some(Secret::from("refreshed")));

    let cached = store.get_credential(&common::user()).unwrap().unwrap();
    assert_eq!(cached.access_token.expose(), "refreshed");
    assert_eq!(cached.refresh_token, Some(Secret::from("r1")));
}

#[tokio::test]
async fn test_failing_vault_with_empty_cache_is_remote_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vault/credentials/lifter@example.com"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(LocalStore::in_memory().unwrap());
    let vault = HttpTokenVault::new(&format!("{}/vault", server.uri())).unwrap();
    let manager = manager(store, vault, &server);

    let err = manager
        .get_valid_access_token(&common::user())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RemoteUnavailable(_)));
    assert!(!err.is_auth());
}

#[tokio::test]
async fn test_revoked_refresh_token_surfaces_auth_expired() {
    let server = MockServer::start().await;
    common::mount_token_rejected(&server).await;

    let store = Arc::new(LocalStore::in_memory().unwrap());
    store
        .put_credential(&common::credential("expired", Duration::seconds(-1), Some("revoked")))
        .unwrap();
    let vault = HttpTokenVault::new(&format!("{}/vault", server.uri())).unwrap();
    let manager = manager(store, vault, &server);

    let err = manager
        .get_valid_access_token(&common::user())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthExpired(_)));
    assert!(err.is_auth());
}
