//! Drive backup repository against a mocked Drive API.

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use liftsync_common::{Error, SnapshotData, SnapshotPayload, TriggerReason};
use liftsync_storage::BackupRepository;

use crate::common::{self, FOLDER_ID};

fn payload() -> SnapshotPayload {
    SnapshotPayload::new(TriggerReason::SessionCompleted, SnapshotData::default())
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_create_snapshot_creates_missing_folder() {
    let (server, repo) = common::setup_drive_mock().await;
    common::mount_folder_lookup(&server, false).await;
    common::mount_upload(&server, "snap-001").await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_string_contains("application/vnd.google-apps.folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": FOLDER_ID,
            "name": "LiftSync Backups",
            "mimeType": "application/vnd.google-apps.folder"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = repo.create_snapshot(&payload()).await.expect("Upload failed");
    assert_eq!(id, "snap-001");
}

#[tokio::test]
async fn test_existing_folder_is_looked_up_once() {
    let (server, repo) = common::setup_drive_mock().await;
    common::mount_upload(&server, "snap-002").await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": FOLDER_ID,
                "name": "LiftSync Backups",
                "mimeType": "application/vnd.google-apps.folder"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    repo.create_snapshot(&payload()).await.unwrap();
    repo.create_snapshot(&payload()).await.unwrap();
}

#[tokio::test]
async fn test_upload_sends_bearer_token_and_payload() {
    let (server, repo) = common::setup_drive_mock().await;
    common::mount_folder_lookup(&server, true).await;

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(body_string_contains("\"triggerReason\":\"session_completed\""))
        .and(body_string_contains(FOLDER_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "snap-003",
            "name": "liftsync-backup.json",
            "mimeType": "application/json"
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(repo.create_snapshot(&payload()).await.unwrap(), "snap-003");
}

// ============================================================================
// Listing and fetch
// ============================================================================

#[tokio::test]
async fn test_list_snapshots_newest_first() {
    let (server, repo) = common::setup_drive_mock().await;
    common::mount_folder_lookup(&server, true).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageSize", common::PAGE_SIZE.to_string()))
        .and(query_param("orderBy", "createdTime desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [
                {
                    "id": "older",
                    "name": "liftsync-backup-a.json",
                    "mimeType": "application/json",
                    "createdTime": "2026-03-01T08:00:00.000Z"
                },
                {
                    "id": "newer",
                    "name": "liftsync-backup-b.json",
                    "mimeType": "application/json",
                    "createdTime": "2026-03-02T08:00:00.000Z"
                }
            ]
        })))
        .mount(&server)
        .await;

    let snapshots = repo.list_snapshots().await.unwrap();
    let ids: Vec<_> = snapshots.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["newer", "older"]);
}

#[tokio::test]
async fn test_list_without_folder_is_empty() {
    let (server, repo) = common::setup_drive_mock().await;
    common::mount_folder_lookup(&server, false).await;

    assert!(repo.list_snapshots().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_snapshot_downloads_media() {
    let (server, repo) = common::setup_drive_mock().await;
    let body = serde_json::to_value(payload()).unwrap();

    Mock::given(method("GET"))
        .and(path("/files/snap-001"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    assert_eq!(repo.fetch_snapshot("snap-001").await.unwrap(), body);
}

// ============================================================================
// Error handling
// ============================================================================

#[tokio::test]
async fn test_unauthorized_is_auth_expired() {
    let (server, repo) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = repo.list_snapshots().await.unwrap_err();
    assert!(matches!(err, Error::AuthExpired(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_server_error_is_remote_unavailable() {
    let (server, repo) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/snap-001"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = repo.fetch_snapshot("snap-001").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_delete_snapshot() {
    let (server, repo) = common::setup_drive_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/files/snap-001"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/files/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    repo.delete_snapshot("snap-001").await.unwrap();
    assert!(matches!(
        repo.delete_snapshot("missing").await,
        Err(Error::NotFound(_))
    ));
}
