//! Google Drive adapter against a mocked Drive v3 API.

use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, ResponseTemplate};

use unidrive_common::{ProviderId, StorageError, ROOT_SENTINEL};
use unidrive_storage::{MemoryFile, FOLDER_MIME_TYPE};

use crate::common;

#[tokio::test]
async fn test_list_files_follows_pages_and_skips_bad_records() {
    let (server, registry) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": "d1",
                "name": "Photos",
                "mimeType": "application/vnd.google-apps.folder",
                "parents": ["root-folder-id"]
            }]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", "'root' in parents and trashed = false"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [
                {
                    "id": "f1",
                    "name": "a.txt",
                    "parents": [],
                    "size": "120",
                    "mimeType": "text/plain"
                },
                { "id": "broken", "mimeType": "text/plain" }
            ],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    let entities = client.list_files(ROOT_SENTINEL).await.unwrap();

    let ids: Vec<&str> = entities.iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec!["f1", "d1"]);

    let file = entities[0].as_file().unwrap();
    assert_eq!(file.parent_id(), ROOT_SENTINEL);
    assert_eq!(file.size_bytes(), Some(120));
    assert_eq!(file.mime_type(), "text/plain");
    assert!(entities[1].is_folder());
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let (server, registry) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    let err = client.list_files(ROOT_SENTINEL).await.unwrap_err();
    assert!(matches!(err, StorageError::Authentication(_)));
}

#[tokio::test]
async fn test_server_error_passes_status_through() {
    let (server, registry) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    let err = client.search("report").await.unwrap_err();
    match err {
        StorageError::Api { status, detail, .. } => {
            assert_eq!(status, Some(503));
            assert!(detail.contains("backend unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_missing_is_false() {
    let (server, registry) = common::setup().await;

    Mock::given(method("DELETE"))
        .and(path("/files/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/files/f1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    assert!(!client.delete_file("gone").await.unwrap());
    assert!(client.delete_file("f1").await.unwrap());
}

#[tokio::test]
async fn test_create_folder_uses_drive_folder_type() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_partial_json(serde_json::json!({
            "name": "Reports",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["p1"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "d9",
            "name": "Reports",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["p1"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    let entity = client
        .create_file("Reports", FOLDER_MIME_TYPE, "p1")
        .await
        .unwrap()
        .unwrap();

    assert!(entity.is_folder());
    assert_eq!(entity.parent_id(), "p1");
}

#[tokio::test]
async fn test_small_upload_is_multipart() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains("hello drive"))
        .and(body_string_contains(r#""parents":["root"]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "up1",
            "name": "hello.txt",
            "mimeType": "text/plain",
            "size": "11"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    let file = MemoryFile::new("hello.txt", "hello drive").with_mime_type("text/plain");
    let entity = client.upload_file(&file, None).await.unwrap().unwrap();

    assert_eq!(entity.id(), "up1");
    assert_eq!(entity.as_file().unwrap().size_bytes(), Some(11));
}

#[tokio::test]
async fn test_upload_with_empty_response_is_none() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    let file = MemoryFile::new("a.txt", "data");
    assert!(client.upload_file(&file, Some("p1")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_large_upload_is_resumable() {
    let (server, registry) = common::setup().await;
    let total: usize = 5 * 1024 * 1024 + 1;
    let session_uri = format!("{}/session/abc", server.uri());

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(query_param("uploadType", "resumable"))
        .and(header("x-upload-content-length", total.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).insert_header("Location", session_uri.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/session/abc"))
        .and(header("content-range", "bytes 5242880-5242880/5242881"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "big1",
            "name": "big.bin",
            "mimeType": "application/octet-stream",
            "size": "5242881"
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/session/abc"))
        .respond_with(ResponseTemplate::new(308))
        .expect(20)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    let file = MemoryFile::new("big.bin", vec![7u8; total]);
    let entity = client.upload_file(&file, None).await.unwrap().unwrap();

    assert_eq!(entity.id(), "big1");
    assert_eq!(entity.as_file().unwrap().size_bytes(), Some(total as u64));
}

#[tokio::test]
async fn test_small_update_patches_media() {
    let (server, registry) = common::setup().await;

    Mock::given(method("PATCH"))
        .and(path("/upload/files/f1"))
        .and(query_param("uploadType", "media"))
        .and(header("content-type", "text/plain"))
        .and(body_string_contains("revised"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "f1",
            "name": "notes.txt",
            "mimeType": "text/plain",
            "size": "7",
            "parents": ["p1"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    let file = MemoryFile::new("notes.txt", "revised").with_mime_type("text/plain");
    let entity = client.update_file(&file, "f1").await.unwrap().unwrap();

    assert_eq!(entity.id(), "f1");
    assert_eq!(entity.parent_id(), "p1");
    assert_eq!(entity.as_file().unwrap().size_bytes(), Some(7));
}

#[tokio::test]
async fn test_large_update_is_resumable() {
    let (server, registry) = common::setup().await;
    let total: usize = 5 * 1024 * 1024 + 1;
    let session_uri = format!("{}/session/upd", server.uri());

    Mock::given(method("PATCH"))
        .and(path("/upload/files/f1"))
        .and(query_param("uploadType", "media"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/upload/files/f1"))
        .and(query_param("uploadType", "resumable"))
        .and(header("x-upload-content-length", total.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).insert_header("Location", session_uri.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/session/upd"))
        .and(header("content-range", "bytes 5242880-5242880/5242881"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "f1",
            "name": "big.bin",
            "mimeType": "application/octet-stream",
            "size": "5242881"
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/session/upd"))
        .respond_with(ResponseTemplate::new(308))
        .expect(20)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;
    let file = MemoryFile::new("big.bin", vec![1u8; total]);
    let entity = client.update_file(&file, "f1").await.unwrap().unwrap();

    assert_eq!(entity.id(), "f1");
    assert_eq!(entity.as_file().unwrap().size_bytes(), Some(total as u64));

    let requests = server.received_requests().await.unwrap();
    let ranges: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == "/session/upd")
        .map(|r| r.headers.get("content-range").unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(ranges.len(), 21);
    assert_eq!(ranges[0], "bytes 0-262143/5242881");
    assert_eq!(ranges[1], "bytes 262144-524287/5242881");
}

#[tokio::test]
async fn test_download_and_export() {
    let (server, registry) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/files/f1"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw bytes".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/doc1/export"))
        .and(query_param("mimeType", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;

    let raw = client.download_file("f1", None).await.unwrap();
    assert_eq!(common::read_stream(raw).await, b"raw bytes");

    let pdf = client
        .download_file("doc1", Some("application/pdf"))
        .await
        .unwrap();
    assert_eq!(common::read_stream(pdf).await, b"%PDF-1.7");
}

#[tokio::test]
async fn test_permissions_and_versions() {
    let (server, registry) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/files/f1/permissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "permissions": [
                { "id": "p1", "type": "user", "role": "owner", "emailAddress": "ann@example.com" },
                { "id": "p2", "type": "anyone" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/f1/revisions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "revisions": [
                { "id": "r1", "modifiedTime": "2024-03-01T10:00:00.000Z", "size": "10" },
                { "id": "r2", "modifiedTime": "2024-03-02T10:00:00.000Z", "size": "12" }
            ]
        })))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::GoogleDrive).await;

    let permissions = client.list_permissions("f1").await.unwrap();
    assert_eq!(permissions.len(), 1);
    assert_eq!(permissions[0].role(), "owner");

    let versions = client.list_versions("f1").await.unwrap();
    let ids: Vec<&str> = versions.iter().map(|v| v.id()).collect();
    assert_eq!(ids, vec!["r1", "r2"]);
}
