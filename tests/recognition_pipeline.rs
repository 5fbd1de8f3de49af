//! End-to-end recognition against stubbed remote services and a real SQLite store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use phyto::classifier::HttpClassifierClient;
use phyto::embedding::HttpEmbeddingClient;
use phyto::gateway::{HandlerState, PHYTO_STATUS_HEADER, create_router_with_state};
use phyto::recognition::{Recognizer, RecognizerConfig, Resolution};
use phyto::records::{RecordStore, SqliteRecordStore};
use phyto::remote::RemoteEndpoint;
use phyto::vectordb::{CollectionSpec, MockVectorStore};
use phyto::RECOGNITION_FAILED_LABEL;

const DIM: usize = 4;

// base64("rose") and base64("tulip")
const ROSE_B64: &str = "cm9zZQ==";
const TULIP_B64: &str = "dHVsaXA=";

type PipelineRecognizer =
    Recognizer<HttpEmbeddingClient, HttpClassifierClient, MockVectorStore, SqliteRecordStore>;

struct Pipeline {
    _temp_dir: TempDir,
    upload_dir: std::path::PathBuf,
    embedding: MockServer,
    classifier: MockServer,
    recognizer: Arc<PipelineRecognizer>,
}

async fn pipeline() -> Pipeline {
    let temp_dir = TempDir::new().expect("temp dir");
    let records = SqliteRecordStore::open(temp_dir.path().join("db").join("phyto.db"))
        .await
        .expect("open record store");

    let embedding = MockServer::start().await;
    let classifier = MockServer::start().await;

    let timeouts = (Duration::from_millis(300), Duration::from_millis(300));
    let embedder = HttpEmbeddingClient::new(
        RemoteEndpoint::new(format!("{}/embed", embedding.uri()))
            .with_timeouts(timeouts.0, timeouts.1),
        "image-embedding-model",
        DIM,
    );
    let classifier_client = HttpClassifierClient::new(
        RemoteEndpoint::new(format!("{}/classify", classifier.uri()))
            .with_timeouts(timeouts.0, timeouts.1),
    );

    let recognizer = Arc::new(Recognizer::new(
        embedder,
        classifier_client,
        MockVectorStore::new(CollectionSpec::new("pipeline_collection", DIM)),
        records,
        RecognizerConfig::default(),
    ));
    assert!(recognizer.init().await);

    Pipeline {
        upload_dir: temp_dir.path().join("uploads"),
        _temp_dir: temp_dir,
        embedding,
        classifier,
        recognizer,
    }
}

async fn stub_embedding(server: &MockServer, image_b64: &str, vector: [f32; DIM]) {
    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_partial_json(json!({"image": image_b64})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": vector})))
        .mount(server)
        .await;
}

async fn stub_classifier(server: &MockServer, label: &str, confidence: &str) {
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"name": label, "confidence": confidence}
        })))
        .mount(server)
        .await;
}

async fn classifier_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_miss_then_hit_reuses_the_stored_record() {
    let p = pipeline().await;
    stub_embedding(&p.embedding, ROSE_B64, [1.0, 0.0, 0.0, 0.0]).await;
    stub_classifier(&p.classifier, "Rose", "0.93").await;

    let first = p.recognizer.recognize(b"rose", Some("/uploads/a.jpg")).await;
    assert_eq!(
        first.resolution,
        Resolution::Classified {
            vector_id: Some("rec_1".to_string())
        }
    );
    assert_eq!(first.record.id, Some(1));
    assert_eq!(first.record.label, "Rose");
    assert_eq!(first.record.confidence, Some(0.93));

    let mapping = p
        .recognizer
        .record_store()
        .mapping_by_vector_id("rec_1")
        .await
        .expect("mapping lookup")
        .expect("mapping saved");
    assert_eq!(mapping.record_id, 1);

    let second = p.recognizer.recognize(b"rose", Some("/uploads/b.jpg")).await;
    assert!(second.is_cache_hit());
    assert_eq!(second.record.id, Some(1));
    assert_eq!(second.record.label, "Rose");
    assert_eq!(second.record.image_ref.as_deref(), Some("/uploads/b.jpg"));

    assert_eq!(classifier_calls(&p.classifier).await, 1);
    assert_eq!(p.recognizer.vector_store().len(), 1);
    assert_eq!(p.recognizer.recent(None).await.expect("recent").len(), 1);
}

#[tokio::test]
async fn test_dissimilar_image_is_classified_separately() {
    let p = pipeline().await;
    stub_embedding(&p.embedding, ROSE_B64, [1.0, 0.0, 0.0, 0.0]).await;
    stub_embedding(&p.embedding, TULIP_B64, [0.0, 1.0, 0.0, 0.0]).await;
    stub_classifier(&p.classifier, "Rose", "0.9").await;

    p.recognizer.recognize(b"rose", None).await;
    let tulip = p.recognizer.recognize(b"tulip", None).await;

    assert_eq!(
        tulip.resolution,
        Resolution::Classified {
            vector_id: Some("rec_2".to_string())
        }
    );
    assert_eq!(classifier_calls(&p.classifier).await, 2);
    assert_eq!(p.recognizer.vector_store().len(), 2);

    let recent = p.recognizer.recent(Some(10)).await.expect("recent");
    let ids: Vec<_> = recent.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![Some(2), Some(1)]);
}

#[tokio::test]
async fn test_classifier_timeout_returns_sentinel_without_writes() {
    let p = pipeline().await;
    stub_embedding(&p.embedding, ROSE_B64, [1.0, 0.0, 0.0, 0.0]).await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(json!({"result": {"name": "Rose", "confidence": 0.9}})),
        )
        .mount(&p.classifier)
        .await;

    let result = p.recognizer.recognize(b"rose", Some("/uploads/a.jpg")).await;

    assert!(result.is_failed());
    assert_eq!(result.record.label, RECOGNITION_FAILED_LABEL);
    assert_eq!(result.record.id, None);
    assert!(p.recognizer.vector_store().is_empty());
    assert!(p.recognizer.recent(None).await.expect("recent").is_empty());
}

#[tokio::test]
async fn test_non_object_classifier_result_returns_sentinel_without_writes() {
    let p = pipeline().await;
    stub_embedding(&p.embedding, ROSE_B64, [1.0, 0.0, 0.0, 0.0]).await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": ["Rose", "Tulip"]})))
        .mount(&p.classifier)
        .await;

    let result = p.recognizer.recognize(b"rose", Some("/uploads/a.jpg")).await;

    assert!(result.is_failed());
    assert_eq!(result.record.label, RECOGNITION_FAILED_LABEL);
    assert!(p.recognizer.vector_store().is_empty());
    assert!(p.recognizer.recent(None).await.expect("recent").is_empty());
}

#[tokio::test]
async fn test_embedding_failure_persists_record_without_vector() {
    let p = pipeline().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&p.embedding)
        .await;
    stub_classifier(&p.classifier, "Tulip", "0.7").await;

    let result = p.recognizer.recognize(b"tulip", None).await;

    assert_eq!(result.resolution, Resolution::Classified { vector_id: None });
    assert_eq!(result.record.id, Some(1));
    assert_eq!(result.record.label, "Tulip");
    assert!(p.recognizer.vector_store().is_empty());
    assert!(
        p.recognizer
            .record_store()
            .mapping_by_vector_id("rec_1")
            .await
            .expect("mapping lookup")
            .is_none()
    );
}

#[tokio::test]
async fn test_hit_on_deleted_record_falls_through_to_classifier() {
    let p = pipeline().await;
    stub_embedding(&p.embedding, ROSE_B64, [1.0, 0.0, 0.0, 0.0]).await;
    stub_classifier(&p.classifier, "Rose", "0.93").await;

    p.recognizer.recognize(b"rose", None).await;
    sqlx::query("DELETE FROM records WHERE id = 1")
        .execute(p.recognizer.record_store().pool())
        .await
        .expect("delete record");

    let result = p.recognizer.recognize(b"rose", None).await;

    assert!(!result.is_cache_hit());
    assert_eq!(result.record.id, Some(2));
    assert_eq!(classifier_calls(&p.classifier).await, 2);
    assert!(!p.recognizer.vector_store().contains("rec_1"));
    assert!(p.recognizer.vector_store().contains("rec_2"));
}

#[tokio::test]
async fn test_http_upload_round_trip() {
    let p = pipeline().await;
    stub_embedding(&p.embedding, ROSE_B64, [1.0, 0.0, 0.0, 0.0]).await;
    stub_classifier(&p.classifier, "Rose", "0.93").await;

    let state = HandlerState::new(Arc::clone(&p.recognizer), p.upload_dir.clone());
    let router = create_router_with_state(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/recognitions")
        .header("content-type", "image/png")
        .body(Body::from("rose"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[PHYTO_STATUS_HEADER], "classified");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let image_ref = json["record"]["image_ref"].as_str().unwrap().to_string();
    assert!(image_ref.starts_with("/uploads/"));
    assert!(image_ref.ends_with(".png"));

    let file_name = image_ref.trim_start_matches("/uploads/");
    let stored = tokio::fs::read(p.upload_dir.join(file_name)).await.unwrap();
    assert_eq!(stored, b"rose");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/recognitions/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["label"], "Rose");
}
