use super::*;
use crate::classifier::{Classification, MockClassifierClient};
use crate::constants::RECOGNITION_FAILED_LABEL;
use crate::embedding::MockEmbeddingClient;
use crate::records::{MockRecordStore, NewRecord, NewVectorMapping, RecordStore};
use crate::vectordb::{CollectionSpec, EntryMetadata, MockVectorStore, VectorStore};

const DIM: usize = 64;

type TestRecognizer =
    Recognizer<MockEmbeddingClient, MockClassifierClient, MockVectorStore, MockRecordStore>;

fn recognizer_with(config: RecognizerConfig) -> TestRecognizer {
    Recognizer::new(
        MockEmbeddingClient::new(DIM),
        MockClassifierClient::default(),
        MockVectorStore::new(CollectionSpec::new("test_collection", DIM)),
        MockRecordStore::new(),
        config,
    )
}

fn recognizer() -> TestRecognizer {
    recognizer_with(RecognizerConfig::default())
}

/// Unit vector along axis `i`, tilted towards axis `i + 1` by `tilt`.
fn axis(i: usize, tilt: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i] = 1.0;
    v[i + 1] = tilt;
    v
}

#[tokio::test]
async fn test_miss_classifies_and_writes_back() {
    let r = recognizer();

    let result = r.recognize(b"rose", Some("/uploads/1.jpg")).await;

    assert_eq!(
        result.resolution,
        Resolution::Classified {
            vector_id: Some("rec_1".to_string())
        }
    );
    assert_eq!(result.record.id, Some(1));
    assert_eq!(result.record.label, "Rose");
    assert_eq!(result.record.image_ref.as_deref(), Some("/uploads/1.jpg"));
    assert_eq!(r.classifier().calls(), 1);
    assert!(r.vector_store().contains("rec_1"));
    assert_eq!(r.record_store().mapping_count(), 1);

    let metadata = r.vector_store().metadata("rec_1").unwrap();
    assert_eq!(metadata.record_id, Some(1));
    assert_eq!(metadata.label.as_deref(), Some("Rose"));
    assert_eq!(metadata.threshold, Some(0.8));
}

#[tokio::test]
async fn test_second_identical_request_hits() {
    let r = recognizer();
    r.recognize(b"rose", Some("/uploads/1.jpg")).await;

    let result = r.recognize(b"rose", Some("/uploads/2.jpg")).await;

    match &result.resolution {
        Resolution::CacheHit { vector_id, score } => {
            assert_eq!(vector_id, "rec_1");
            assert!(*score > 0.99);
        }
        other => panic!("expected cache hit, got {other:?}"),
    }
    assert!(result.is_cache_hit());
    assert_eq!(result.record.id, Some(1));
    assert_eq!(result.record.image_ref.as_deref(), Some("/uploads/2.jpg"));
    assert_eq!(r.classifier().calls(), 1);
    assert_eq!(r.record_store().len(), 1);

    let stored = r.record_store().get(1).await.unwrap().unwrap();
    assert_eq!(stored.image_ref.as_deref(), Some("/uploads/2.jpg"));
    assert!(stored.updated_at >= stored.created_at);
}

#[tokio::test]
async fn test_hit_without_image_ref_keeps_stored_ref() {
    let r = recognizer();
    r.recognize(b"rose", Some("/uploads/1.jpg")).await;

    let result = r.recognize(b"rose", None).await;

    assert!(result.is_cache_hit());
    assert_eq!(result.record.image_ref.as_deref(), Some("/uploads/1.jpg"));
}

#[tokio::test]
async fn test_similar_image_hits() {
    let r = recognizer();
    r.embedder().pin(b"rose-a", axis(0, 0.0));
    r.embedder().pin(b"rose-b", axis(0, 0.3));

    r.recognize(b"rose-a", None).await;
    let result = r.recognize(b"rose-b", None).await;

    assert!(result.is_cache_hit());
    assert_eq!(r.classifier().calls(), 1);
}

#[tokio::test]
async fn test_dissimilar_image_misses() {
    let r = recognizer();
    r.embedder().pin(b"rose", axis(0, 0.0));
    r.embedder().pin(b"tulip", axis(2, 0.0));
    r.classifier()
        .script(b"tulip", Classification::new("Tulip", 0.71));

    r.recognize(b"rose", None).await;
    let result = r.recognize(b"tulip", None).await;

    assert!(!result.is_cache_hit());
    assert_eq!(result.record.label, "Tulip");
    assert_eq!(result.record.id, Some(2));
    assert_eq!(r.classifier().calls(), 2);
    assert_eq!(r.vector_store().len(), 2);
}

#[tokio::test]
async fn test_threshold_is_respected() {
    // cos(axis(0,0), axis(0,0.3)) ~= 0.958
    let r = recognizer_with(RecognizerConfig::default().with_threshold(0.99));
    r.embedder().pin(b"rose-a", axis(0, 0.0));
    r.embedder().pin(b"rose-b", axis(0, 0.3));

    r.recognize(b"rose-a", None).await;
    let result = r.recognize(b"rose-b", None).await;

    assert!(!result.is_cache_hit());
    assert_eq!(r.classifier().calls(), 2);
}

#[tokio::test]
async fn test_dangling_entry_is_removed_and_reclassified() {
    let r = recognizer();
    r.recognize(b"rose", None).await;
    r.record_store().remove(1);

    let result = r.recognize(b"rose", None).await;

    assert_eq!(
        result.resolution,
        Resolution::Classified {
            vector_id: Some("rec_2".to_string())
        }
    );
    assert_eq!(r.classifier().calls(), 2);
    assert!(!r.vector_store().contains("rec_1"));
    assert!(r.vector_store().contains("rec_2"));
}

#[tokio::test]
async fn test_classifier_failure_returns_sentinel_without_writes() {
    let r = recognizer();
    r.classifier().set_failing(true);

    let result = r.recognize(b"rose", Some("/uploads/1.jpg")).await;

    assert!(result.is_failed());
    assert_eq!(result.record.label, RECOGNITION_FAILED_LABEL);
    assert_eq!(result.record.confidence, Some(0.0));
    assert_eq!(result.record.id, None);
    assert!(r.record_store().is_empty());
    assert!(r.vector_store().is_empty());
}

#[tokio::test]
async fn test_classifier_result_is_returned_as_is() {
    let r = recognizer();
    r.classifier()
        .script(b"leaf", Classification::new("Rose", 0.93));

    let result = r.recognize(b"leaf", None).await;

    assert_eq!(result.record.label, "Rose");
    assert!((result.record.confidence.unwrap() - 0.93).abs() < 1e-6);
}

#[tokio::test]
async fn test_embedding_failure_persists_without_vector() {
    let r = recognizer();
    r.embedder().set_failing(true);

    let result = r.recognize(b"rose", None).await;

    assert_eq!(result.resolution, Resolution::Classified { vector_id: None });
    assert_eq!(result.record.id, Some(1));
    assert_eq!(r.classifier().calls(), 1);
    assert_eq!(r.record_store().len(), 1);
    assert!(r.vector_store().is_empty());
    assert_eq!(r.record_store().mapping_count(), 0);
}

#[tokio::test]
async fn test_vector_write_failure_still_returns_record() {
    let r = recognizer();
    r.vector_store().set_fail_writes(true);

    let result = r.recognize(b"rose", None).await;

    assert_eq!(result.resolution, Resolution::Classified { vector_id: None });
    assert_eq!(result.record.id, Some(1));
    assert_eq!(r.record_store().mapping_count(), 0);
}

#[tokio::test]
async fn test_search_failure_is_a_miss() {
    let r = recognizer();
    r.recognize(b"rose", None).await;
    r.vector_store().set_fail_search(true);

    let result = r.recognize(b"rose", None).await;

    assert!(!result.is_cache_hit());
    assert_eq!(r.classifier().calls(), 2);
}

#[tokio::test]
async fn test_record_save_failure_returns_unsaved_record() {
    let r = recognizer();
    r.record_store().set_fail_inserts(true);

    let result = r.recognize(b"rose", Some("/uploads/1.jpg")).await;

    assert_eq!(result.resolution, Resolution::Classified { vector_id: None });
    assert_eq!(result.record.id, None);
    assert_eq!(result.record.label, "Rose");
    assert_eq!(result.record.image_ref.as_deref(), Some("/uploads/1.jpg"));
    assert!(r.vector_store().is_empty());
}

#[tokio::test]
async fn test_record_lookup_failure_is_a_miss() {
    let r = recognizer();
    r.recognize(b"rose", None).await;
    r.record_store().set_fail_reads(true);

    let result = r.recognize(b"rose", None).await;

    assert!(!result.is_cache_hit());
    assert_eq!(r.classifier().calls(), 2);
    assert!(r.vector_store().contains("rec_1"));
}

#[tokio::test]
async fn test_hit_resolved_through_mapping_table() {
    let r = recognizer();
    r.embedder().pin(b"rose", axis(0, 0.0));

    let record = r
        .record_store()
        .insert(NewRecord {
            label: "Rose".to_string(),
            confidence: Some(0.9),
            image_ref: None,
        })
        .await
        .unwrap();
    r.record_store()
        .save_mapping(NewVectorMapping {
            record_id: record.id.unwrap(),
            vector_id: "imported-rose".to_string(),
            similarity_threshold: 0.8,
        })
        .await
        .unwrap();
    r.vector_store()
        .insert("imported-rose", axis(0, 0.0), EntryMetadata::default())
        .await;

    let result = r.recognize(b"rose", None).await;

    assert!(result.is_cache_hit());
    assert_eq!(result.record.id, record.id);
    assert_eq!(r.classifier().calls(), 0);
}

#[tokio::test]
async fn test_hit_resolved_from_vector_id() {
    let r = recognizer();
    r.embedder().pin(b"rose", axis(0, 0.0));

    let record = r
        .record_store()
        .insert(NewRecord {
            label: "Rose".to_string(),
            confidence: Some(0.9),
            image_ref: None,
        })
        .await
        .unwrap();
    r.vector_store()
        .insert("rec_1", axis(0, 0.0), EntryMetadata::default())
        .await;

    let result = r.recognize(b"rose", None).await;

    assert!(result.is_cache_hit());
    assert_eq!(result.record, record);
}

#[tokio::test]
async fn test_unresolvable_entry_is_a_miss() {
    let r = recognizer();
    r.embedder().pin(b"rose", axis(0, 0.0));
    r.vector_store()
        .insert("foreign", axis(0, 0.0), EntryMetadata::default())
        .await;

    let result = r.recognize(b"rose", None).await;

    assert!(!result.is_cache_hit());
    assert_eq!(r.classifier().calls(), 1);
    assert!(r.vector_store().contains("foreign"));
}

#[tokio::test]
async fn test_recent_clamps_limit() {
    let r = recognizer();
    for image in [b"a".as_slice(), b"b", b"c"] {
        r.recognize(image, None).await;
    }

    assert_eq!(r.recent(Some(0)).await.unwrap().len(), 1);
    assert_eq!(r.recent(None).await.unwrap().len(), 3);
    assert_eq!(r.recent(Some(1_000)).await.unwrap().len(), 3);
    assert_eq!(r.recent(Some(2)).await.unwrap()[0].id, Some(3));
}

#[tokio::test]
async fn test_get_delegates_to_store() {
    let r = recognizer();
    r.recognize(b"rose", None).await;

    assert_eq!(r.get(1).await.unwrap().unwrap().label, "Rose");
    assert!(r.get(2).await.unwrap().is_none());
}

#[tokio::test]
async fn test_init_prepares_collection() {
    let r = recognizer();
    assert!(r.init().await);
    assert!(r.vector_store().is_initialized());

    r.vector_store().set_fail_writes(true);
    assert!(!r.init().await);
}

#[test]
fn test_config_from_app_config() {
    let config = crate::config::Config {
        similarity_threshold: 0.65,
        ..Default::default()
    };
    let rc = RecognizerConfig::from_config(&config);
    assert_eq!(rc.similarity_threshold, 0.65);
    assert_eq!(rc.top_k, 1);
}
