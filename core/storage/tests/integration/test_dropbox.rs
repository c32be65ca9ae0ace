//! Dropbox adapter against mocked RPC and content endpoints.

use wiremock::matchers::{body_json, body_partial_json, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

use unidrive_common::{ProviderId, StorageError, ROOT_SENTINEL};
use unidrive_storage::{MemoryFile, FOLDER_MIME_TYPE};

use crate::common;

#[tokio::test]
async fn test_list_root_continues_with_cursor() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files/list_folder"))
        .and(body_partial_json(serde_json::json!({ "path": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": [
                {
                    ".tag": "file",
                    "id": "id:f1",
                    "name": "a.txt",
                    "path_lower": "/a.txt",
                    "server_modified": "2024-01-10T09:00:00Z",
                    "size": 3
                },
                { ".tag": "deleted", "name": "old.txt", "path_lower": "/old.txt" }
            ],
            "cursor": "cursor-1",
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/files/list_folder/continue"))
        .and(body_json(serde_json::json!({ "cursor": "cursor-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": [{
                ".tag": "folder",
                "id": "id:d1",
                "name": "Docs",
                "path_lower": "/docs"
            }],
            "cursor": "cursor-2",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::Dropbox).await;
    let entities = client.list_files(ROOT_SENTINEL).await.unwrap();

    let ids: Vec<&str> = entities.iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec!["id:f1", "id:d1"]);
    assert!(entities.iter().all(|e| e.parent_id() == ROOT_SENTINEL));
    assert_eq!(entities[0].as_file().unwrap().mime_type(), "text/plain");
}

#[tokio::test]
async fn test_search_unwraps_matches() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files/search_v2"))
        .and(body_partial_json(serde_json::json!({ "query": "report" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "matches": [{
                "match_type": { ".tag": "filename" },
                "metadata": {
                    ".tag": "metadata",
                    "metadata": {
                        ".tag": "file",
                        "id": "id:r1",
                        "name": "report.pdf",
                        "path_lower": "/work/report.pdf",
                        "size": 900
                    }
                }
            }],
            "has_more": false
        })))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::Dropbox).await;
    let results = client.search("report").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].parent_id(), "/work");
    assert_eq!(results[0].as_file().unwrap().mime_type(), "application/pdf");
}

#[tokio::test]
async fn test_delete_not_found_is_false() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files/delete_v2"))
        .and(body_json(serde_json::json!({ "path": "/missing.txt" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error_summary": "path_lookup/not_found/..",
            "error": { ".tag": "path_lookup", "path_lookup": { ".tag": "not_found" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/delete_v2"))
        .and(body_json(serde_json::json!({ "path": "/locked.txt" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error_summary": "path_write/conflict/..",
            "error": { ".tag": "path_write" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/delete_v2"))
        .and(body_json(serde_json::json!({ "path": "id:f1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "metadata": { ".tag": "file", "id": "id:f1", "name": "a.txt" }
        })))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::Dropbox).await;

    assert!(!client.delete_file("/missing.txt").await.unwrap());
    assert!(client.delete_file("id:f1").await.unwrap());

    let err = client.delete_file("/locked.txt").await.unwrap_err();
    assert!(matches!(err, StorageError::Api { status: Some(409), .. }));
}

#[tokio::test]
async fn test_create_folder_tags_result() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files/create_folder_v2"))
        .and(body_partial_json(serde_json::json!({ "path": "/docs/Invoices" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "metadata": { "id": "id:new", "name": "Invoices", "path_lower": "/docs/invoices" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::Dropbox).await;
    let entity = client
        .create_file("Invoices", FOLDER_MIME_TYPE, "/docs")
        .await
        .unwrap()
        .unwrap();

    assert!(entity.is_folder());
    assert_eq!(entity.parent_id(), "/docs");
}

#[tokio::test]
async fn test_upload_sends_ascii_api_arg() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/content/files/upload"))
        .and(header_exists("dropbox-api-arg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "id:up",
            "name": "Résumé.txt",
            "path_lower": "/résumé.txt",
            "server_modified": "2024-01-10T09:00:00Z",
            "size": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::Dropbox).await;
    let entity = client
        .upload_file(&MemoryFile::new("Résumé.txt", "hello"), None)
        .await
        .unwrap()
        .unwrap();

    assert!(!entity.is_folder());
    assert_eq!(entity.parent_id(), ROOT_SENTINEL);

    let requests = server.received_requests().await.unwrap();
    let arg = requests[0]
        .headers
        .get("dropbox-api-arg")
        .unwrap()
        .to_str()
        .unwrap();
    let arg: serde_json::Value = serde_json::from_str(arg).unwrap();

    assert_eq!(arg["path"], "/Résumé.txt");
    assert_eq!(arg["mode"], "add");
    assert_eq!(requests[0].body, b"hello");
}

#[tokio::test]
async fn test_update_overwrites_by_id() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/content/files/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "id:notes",
            "name": "notes.txt",
            "path_lower": "/docs/notes.txt",
            "server_modified": "2024-02-01T10:00:00Z",
            "size": 9
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::Dropbox).await;
    let entity = client
        .update_file(&MemoryFile::new("notes.txt", "new notes"), "id:notes")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(entity.id(), "id:notes");
    assert_eq!(entity.as_file().unwrap().size_bytes(), Some(9));

    let requests = server.received_requests().await.unwrap();
    let arg: serde_json::Value = serde_json::from_str(
        requests[0].headers.get("dropbox-api-arg").unwrap().to_str().unwrap(),
    )
    .unwrap();
    assert_eq!(arg["path"], "id:notes");
    assert_eq!(arg["mode"], "overwrite");
    assert_eq!(arg["autorename"], false);
    assert_eq!(requests[0].body, b"new notes");
}

#[tokio::test]
async fn test_oversized_upload_and_update_are_rejected() {
    let (server, registry) = common::setup().await;
    let client = common::connect(&registry, ProviderId::Dropbox).await;
    let file = common::DeclaredSizeFile {
        name: "huge.iso",
        size: 200 * 1024 * 1024,
    };

    let err = client.upload_file(&file, None).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));

    let err = client.update_file(&file, "id:huge").await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_child_parent_id_lists_the_parent_folder() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files/list_folder"))
        .and(body_partial_json(serde_json::json!({ "path": "id:math" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": [{
                ".tag": "file",
                "id": "id:primes",
                "name": "Primes.txt",
                "path_lower": "/homework/math/primes.txt",
                "server_modified": "2024-01-10T09:00:00Z",
                "size": 3
            }],
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/list_folder"))
        .and(body_partial_json(serde_json::json!({ "path": "/homework/math" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": [], "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::Dropbox).await;
    let children = client.list_files("id:math").await.unwrap();
    assert_eq!(children[0].parent_id(), "/homework/math");

    // The parent reference is itself a usable folder id.
    assert!(client.list_files(children[0].parent_id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_operations() {
    let (_server, registry) = common::setup().await;
    let client = common::connect(&registry, ProviderId::Dropbox).await;

    let err = client.list_permissions("id:f1").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::NotImplemented { provider: ProviderId::Dropbox, operation: "list_permissions" }
    ));

    let err = client
        .download_file("id:f1", Some("application/pdf"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, StorageError::NotImplemented { .. }));
}

#[tokio::test]
async fn test_download_and_revisions() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/content/files/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"file body".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/list_revisions"))
        .and(body_partial_json(serde_json::json!({ "path": "id:f1", "mode": "id" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_deleted": false,
            "entries": [
                { ".tag": "file", "id": "id:f1", "name": "a.txt", "rev": "0002", "server_modified": "2024-01-11T09:00:00Z", "size": 9 },
                { ".tag": "file", "id": "id:f1", "name": "a.txt", "rev": "0001", "server_modified": "2024-01-10T09:00:00Z", "size": 3 }
            ]
        })))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::Dropbox).await;

    let body = client.download_file("id:f1", None).await.unwrap();
    assert_eq!(common::read_stream(body).await, b"file body");

    let versions = client.list_versions("id:f1").await.unwrap();
    let revs: Vec<&str> = versions.iter().map(|v| v.id()).collect();
    assert_eq!(revs, vec!["0002", "0001"]);
}

#[tokio::test]
async fn test_unauthorized() {
    let (server, registry) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files/list_folder"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error_summary": "invalid_access_token/..."
        })))
        .mount(&server)
        .await;

    let client = common::connect(&registry, ProviderId::Dropbox).await;
    let err = client.list_files(ROOT_SENTINEL).await.unwrap_err();
    assert!(matches!(err, StorageError::Authentication(_)));
}
