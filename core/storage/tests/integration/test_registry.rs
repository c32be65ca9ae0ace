//! Registry behaviour observed over the wire.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use unidrive_common::{Credential, ProviderId, ROOT_SENTINEL};

use crate::common::{self, DRIVE_ID};

#[tokio::test]
async fn test_new_credential_sends_new_token() {
    let (server, registry) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer first-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer second-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let first = registry
        .connect(ProviderId::GoogleDrive, &Credential::new("first-token"))
        .await
        .unwrap();
    first.list_files(ROOT_SENTINEL).await.unwrap();

    let second = registry
        .connect(ProviderId::GoogleDrive, &Credential::new("second-token"))
        .await
        .unwrap();
    second.list_files(ROOT_SENTINEL).await.unwrap();
}

#[tokio::test]
async fn test_reused_handle_keeps_resolved_drive() {
    let (server, registry) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/me/drive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": DRIVE_ID })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/drives/{}/root/children", DRIVE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": [] })))
        .mount(&server)
        .await;

    // Same credential: one lookup shared by both storage clients.
    for _ in 0..2 {
        let client = common::connect(&registry, ProviderId::OneDrive).await;
        client.list_files(ROOT_SENTINEL).await.unwrap();
    }

    // A different credential gets a fresh handle and looks the drive up again.
    let other = registry
        .connect(ProviderId::OneDrive, &Credential::new("other-token"))
        .await
        .unwrap();
    other.list_files(ROOT_SENTINEL).await.unwrap();
}

#[tokio::test]
async fn test_invalidate_forces_rebuild() {
    let (server, registry) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/me/drive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": DRIVE_ID })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/drives/{}/root/children", DRIVE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": [] })))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::OneDrive).await;
    client.list_files(ROOT_SENTINEL).await.unwrap();

    registry.invalidate(ProviderId::OneDrive).await;

    let client = common::connect(&registry, ProviderId::OneDrive).await;
    client.list_files(ROOT_SENTINEL).await.unwrap();
}

#[tokio::test]
async fn test_providers_are_independent() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files/list_folder"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": [], "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer drive-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let dropbox = common::connect(&registry, ProviderId::Dropbox).await;
    let gdrive = registry
        .connect(ProviderId::GoogleDrive, &Credential::new("drive-token"))
        .await
        .unwrap();

    assert!(dropbox.list_files(ROOT_SENTINEL).await.unwrap().is_empty());
    assert!(gdrive.list_files(ROOT_SENTINEL).await.unwrap().is_empty());
    assert_eq!(dropbox.root_folder().name(), ProviderId::Dropbox.root_display_name());
}
