//! Integration tests for the parsing gateway and object storage adapters
//! against a mock HTTP server.

use api_lib::adapters::{HttpObjectStorage, HttpParsingGateway};
use api_lib::config::StorageConfig;
use fundiq_core::domain::{FileType, IncomingFile, ParseRequest, UserContext};
use fundiq_core::ports::{ObjectStorage, ParsingGateway, PortError};
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> HttpParsingGateway {
    HttpParsingGateway::new(server.uri(), Duration::from_secs(5)).expect("client builds")
}

#[tokio::test]
async fn test_parse_upload_sends_multipart_file() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse"))
        .and(body_string_contains("filename=\"ledger.csv\""))
        .and(body_string_contains("a,b\n1,2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "document_id": Uuid::new_v4(),
            "rows_extracted": 1
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = gateway(&mock_server)
        .parse_upload(&IncomingFile::new("ledger.csv", "a,b\n1,2"))
        .await
        .expect("parse succeeds");

    assert!(outcome.success);
    assert_eq!(outcome.rows_extracted, Some(1));
}

#[tokio::test]
async fn test_parse_reference_posts_json_body() {
    let mock_server = MockServer::start().await;
    let document_id = Uuid::new_v4();
    let request = ParseRequest {
        document_id,
        file_url: "https://storage/doc.pdf".to_string(),
        file_type: FileType::Pdf,
    };

    Mock::given(method("POST"))
        .and(path("/parse"))
        .and(body_json(serde_json::json!({
            "document_id": document_id,
            "file_url": "https://storage/doc.pdf",
            "file_type": "pdf"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true, "rows_extracted": 42})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = gateway(&mock_server)
        .parse_reference(&request)
        .await
        .expect("parse succeeds");
    assert_eq!(outcome.rows_extracted, Some(42));
}

#[tokio::test]
async fn test_unsuccessful_outcome_is_returned_not_raised() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"success": false, "error": "PDF is password protected"}),
        ))
        .mount(&mock_server)
        .await;

    let outcome = gateway(&mock_server)
        .parse_upload(&IncomingFile::new("locked.pdf", vec![1u8, 2, 3]))
        .await
        .expect("transport succeeds");

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("PDF is password protected"));
}

#[tokio::test]
async fn test_error_status_surfaces_service_detail() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"detail": "Unsupported file type"})),
        )
        .mount(&mock_server)
        .await;

    let err = gateway(&mock_server)
        .parse_upload(&IncomingFile::new("a.pdf", vec![0u8]))
        .await
        .unwrap_err();

    assert!(matches!(err, PortError::Unexpected(ref m) if m == "Unsupported file type"));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let gateway = HttpParsingGateway::new(mock_server.uri(), Duration::from_secs(1))
        .expect("client builds");
    let err = gateway
        .parse_upload(&IncomingFile::new("slow.pdf", vec![0u8]))
        .await
        .unwrap_err();

    assert!(
        matches!(err, PortError::Timeout(ref m) if m == "Parsing timed out after 1 seconds"),
        "got: {:?}",
        err
    );
}

fn storage(server: &MockServer) -> HttpObjectStorage {
    HttpObjectStorage::new(
        reqwest::Client::new(),
        StorageConfig {
            base_url: server.uri(),
            bucket: "documents".to_string(),
            service_key: "service-key".to_string(),
        },
    )
}

#[tokio::test]
async fn test_storage_upload_uses_user_scoped_key() {
    let mock_server = MockServer::start().await;
    let user = UserContext::new(Uuid::new_v4());
    let key_pattern = format!(
        r"^/storage/v1/object/documents/{}/\d+_Q1_report\.pdf$",
        user.user_id
    );

    Mock::given(method("POST"))
        .and(path_regex(key_pattern.as_str()))
        .and(header("authorization", "Bearer service-key"))
        .and(header("apikey", "service-key"))
        .and(header("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"Key": "x"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let stored = storage(&mock_server)
        .upload(&user, &IncomingFile::new("Q1 report.pdf", vec![1u8, 2, 3]))
        .await
        .expect("upload succeeds");

    assert!(stored.path.starts_with(&user.user_id.to_string()));
    assert!(stored.path.ends_with("_Q1_report.pdf"));
    assert_eq!(
        stored.url,
        format!(
            "{}/storage/v1/object/public/documents/{}",
            mock_server.uri(),
            stored.path
        )
    );
}

#[tokio::test]
async fn test_storage_failure_reports_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("bucket not found"))
        .mount(&mock_server)
        .await;

    let err = storage(&mock_server)
        .upload(
            &UserContext::new(Uuid::new_v4()),
            &IncomingFile::new("a.csv", "x"),
        )
        .await
        .unwrap_err();

    match err {
        PortError::Unexpected(message) => {
            assert!(message.contains("403"), "got: {}", message);
            assert!(message.contains("bucket not found"), "got: {}", message);
        }
        other => panic!("expected an unexpected-error, got {:?}", other),
    }
}
