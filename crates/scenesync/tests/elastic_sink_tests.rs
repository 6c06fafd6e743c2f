//! Elasticsearch sink HTTP contract tests
//!
//! These tests validate the sink against a mocked HTTP surface:
//! - Index provisioning only when the index is absent
//! - Existence checks and single `_create` writes
//! - 409 mapping to duplicate instead of failure
//! - Per-item result parsing of `_bulk` responses

use std::time::Duration;

use scenesync::{ElasticSink, SceneRecord, SceneSink, SyncError, WriteOutcome};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to build a minimal coerced record.
fn scene_record(id: &str) -> SceneRecord {
    let header: Vec<String> = ["sceneID", "sensor"].iter().map(|s| s.to_string()).collect();
    let mut row = csv_async::StringRecord::new();
    row.push_field(id);
    row.push_field("OLI_TIRS");
    SceneRecord::from_row(&header, &row, 2).expect("valid row")
}

fn sink(server: &MockServer) -> ElasticSink {
    ElasticSink::new(&server.uri(), "landsat", 5).expect("build sink")
}

#[tokio::test]
async fn test_existing_index_is_not_recreated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/landsat"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/landsat"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    sink(&mock_server).ensure_target().await.unwrap();
}

#[tokio::test]
async fn test_missing_index_is_created_with_mapping() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/landsat"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/landsat"))
        .and(body_string_contains("geo_shape"))
        .and(body_string_contains("sceneID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    sink(&mock_server).ensure_target().await.unwrap();
}

#[tokio::test]
async fn test_exists_maps_status_codes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/landsat/_doc/LC1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/landsat/_doc/LC2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let sink = sink(&mock_server);
    assert!(sink.exists("LC1").await.unwrap());
    assert!(!sink.exists("LC2").await.unwrap());
}

#[tokio::test]
async fn test_write_one_created() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/landsat/_create/LC1"))
        .and(body_string_contains("OLI_TIRS"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"result": "created"})))
        .mount(&mock_server)
        .await;

    let outcome = sink(&mock_server).write_one(&scene_record("LC1")).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Created);
}

#[tokio::test]
async fn test_write_one_conflict_is_duplicate_not_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/landsat/_create/LC1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"type": "version_conflict_engine_exception"}
        })))
        .mount(&mock_server)
        .await;

    let outcome = sink(&mock_server).write_one(&scene_record("LC1")).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Duplicate);
}

#[tokio::test]
async fn test_write_one_server_error_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/landsat/_create/LC1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let err = sink(&mock_server).write_one(&scene_record("LC1")).await.unwrap_err();
    assert!(matches!(err, SyncError::SinkUnavailable(_)));
}

#[tokio::test]
async fn test_bulk_reports_per_item_outcomes() {
    let mock_server = MockServer::start().await;

    // One created, one duplicate conflict, one mapping rejection
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(body_string_contains("\"_id\":\"A\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 5,
            "errors": true,
            "items": [
                {"create": {"_index": "landsat", "_id": "A", "status": 201}},
                {"create": {"_index": "landsat", "_id": "B", "status": 409, "error": {
                    "type": "version_conflict_engine_exception",
                    "reason": "document already exists"
                }}},
                {"create": {"_index": "landsat", "_id": "C", "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field"
                }}}
            ]
        })))
        .mount(&mock_server)
        .await;

    let records = vec![scene_record("A"), scene_record("B"), scene_record("C")];
    let report = sink(&mock_server).write_bulk(&records).await.unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.conflicts, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.accepted(), 1);
}

#[tokio::test]
async fn test_bulk_request_is_ndjson_with_create_actions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(body_string_contains("\"create\""))
        .and(body_string_contains("\"_index\":\"landsat\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 1,
            "errors": false,
            "items": [{"create": {"_index": "landsat", "_id": "A", "status": 201}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = sink(&mock_server)
        .write_bulk(&[scene_record("A")])
        .await
        .unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.conflicts, 0);
}

#[tokio::test]
async fn test_bulk_server_error_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let err = sink(&mock_server)
        .write_bulk(&[scene_record("A")])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::SinkUnavailable(_)));
}

#[tokio::test]
async fn test_slow_sink_surfaces_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/landsat/_doc/LC1"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let sink = ElasticSink::new(&mock_server.uri(), "landsat", 1).unwrap();
    let err = sink.exists("LC1").await.unwrap_err();
    assert!(matches!(err, SyncError::SinkTimeout(_)));
}
