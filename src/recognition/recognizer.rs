use tracing::{debug, info, instrument, warn};

use super::model::{Recognition, RecognizerConfig, Resolution, Stage};
use crate::classifier::ClassifierClient;
use crate::constants::{
    DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT, record_id_from_vector_id, vector_id_for_record,
};
use crate::embedding::EmbeddingClient;
use crate::records::{NewRecord, NewVectorMapping, Record, RecordStore, RecordStoreError};
use crate::vectordb::{EntryMetadata, SearchResult, VectorStore};

/// Embedding-similarity cache in front of the classifier.
///
/// Each call embeds the image and looks for a stored neighbor above the
/// configured threshold. A hit returns the stored record. A miss classifies the
/// image, saves the record and writes its vector back so the next similar image
/// hits. Collaborator failures degrade instead of propagating: a broken
/// embedder or vector store turns every request into a miss, and a broken
/// classifier yields the failure sentinel.
pub struct Recognizer<E, C, V, R> {
    embedder: E,
    classifier: C,
    vectors: V,
    records: R,
    config: RecognizerConfig,
}

impl<E, C, V, R> Recognizer<E, C, V, R>
where
    E: EmbeddingClient,
    C: ClassifierClient,
    V: VectorStore,
    R: RecordStore,
{
    pub fn new(
        embedder: E,
        classifier: C,
        vectors: V,
        records: R,
        config: RecognizerConfig,
    ) -> Self {
        Self {
            embedder,
            classifier,
            vectors,
            records,
            config,
        }
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn vector_store(&self) -> &V {
        &self.vectors
    }

    pub fn record_store(&self) -> &R {
        &self.records
    }

    /// Prepares the vector collection. Safe to call on every start.
    pub async fn init(&self) -> bool {
        let ready = self.vectors.init_collection().await;
        if ready {
            info!("Vector collection ready");
        } else {
            warn!("Vector collection unavailable; requests will fall through to the classifier");
        }
        ready
    }

    /// Identifies the subject in `image`, attaching `image_ref` to the resulting record.
    #[instrument(skip(self, image), fields(image_len = image.len()))]
    pub async fn recognize(&self, image: &[u8], image_ref: Option<&str>) -> Recognition {
        debug!(stage = Stage::Embedding.as_str());
        let embedding = match self.embedder.embed(image).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "Embedding failed; skipping cache lookup");
                None
            }
        };

        if let Some(vector) = &embedding
            && let Some(hit) = self.lookup(vector.clone(), image_ref).await
        {
            return hit;
        }

        debug!(stage = Stage::Miss.as_str());
        self.classify_and_store(image, image_ref, embedding).await
    }

    /// Newest records first. `limit` defaults to 10 and is clamped to `1..=100`.
    pub async fn recent(&self, limit: Option<u32>) -> Result<Vec<Record>, RecordStoreError> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);
        self.records.recent(limit).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Record>, RecordStoreError> {
        self.records.get(id).await
    }

    async fn lookup(&self, vector: Vec<f32>, image_ref: Option<&str>) -> Option<Recognition> {
        debug!(stage = Stage::Searching.as_str());
        let best = self
            .vectors
            .search(vector, self.config.top_k, self.config.similarity_threshold)
            .await
            .into_iter()
            .next()?;

        let Some(record_id) = self.resolve_record_id(&best).await else {
            warn!(vector_id = %best.vector_id, "Cache entry has no record id; treating as miss");
            return None;
        };

        match self.records.get(record_id).await {
            Ok(Some(record)) => {
                debug!(
                    stage = Stage::Hit.as_str(),
                    vector_id = %best.vector_id,
                    record_id,
                    score = best.score
                );
                let record = self.attach_image(record, image_ref).await;
                Some(Recognition {
                    record,
                    resolution: Resolution::CacheHit {
                        vector_id: best.vector_id,
                        score: best.score,
                    },
                })
            }
            Ok(None) => {
                warn!(
                    vector_id = %best.vector_id,
                    record_id,
                    "Cache entry points at a missing record; removing it"
                );
                if !self.vectors.delete(&best.vector_id).await {
                    debug!(vector_id = %best.vector_id, "Dangling entry left in place");
                }
                None
            }
            Err(e) => {
                warn!(record_id, error = %e, "Record lookup failed; treating as miss");
                None
            }
        }
    }

    /// Metadata first, then the mapping table, then the `rec_<id>` naming scheme.
    async fn resolve_record_id(&self, hit: &SearchResult) -> Option<i64> {
        if let Some(id) = hit.metadata.record_id {
            return Some(id);
        }

        match self.records.mapping_by_vector_id(&hit.vector_id).await {
            Ok(Some(mapping)) => return Some(mapping.record_id),
            Ok(None) => {}
            Err(e) => debug!(vector_id = %hit.vector_id, error = %e, "Mapping lookup failed"),
        }

        record_id_from_vector_id(&hit.vector_id)
    }

    async fn attach_image(&self, record: Record, image_ref: Option<&str>) -> Record {
        let (Some(image_ref), Some(id)) = (image_ref, record.id) else {
            return record;
        };

        match self.records.attach_image(id, image_ref).await {
            Ok(Some(updated)) => updated,
            Ok(None) => Record {
                image_ref: Some(image_ref.to_string()),
                ..record
            },
            Err(e) => {
                warn!(record_id = id, error = %e, "Could not persist image reference");
                Record {
                    image_ref: Some(image_ref.to_string()),
                    ..record
                }
            }
        }
    }

    async fn classify_and_store(
        &self,
        image: &[u8],
        image_ref: Option<&str>,
        embedding: Option<Vec<f32>>,
    ) -> Recognition {
        debug!(stage = Stage::Classifying.as_str());
        let classification = match self.classifier.classify(image).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "Classification failed");
                return Recognition {
                    record: Record::recognition_failed(),
                    resolution: Resolution::Failed,
                };
            }
        };

        debug!(stage = Stage::Persisting.as_str(), label = %classification.label);
        let new_record = NewRecord {
            label: classification.label,
            confidence: Some(classification.confidence),
            image_ref: image_ref.map(str::to_string),
        };

        let record = match self.records.insert(new_record.clone()).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Could not save record; returning it unsaved");
                return Recognition {
                    record: Record::unsaved(new_record),
                    resolution: Resolution::Classified { vector_id: None },
                };
            }
        };

        let vector_id = match (record.id, embedding) {
            (Some(id), Some(vector)) => self.write_back(&record, id, vector).await,
            _ => None,
        };

        Recognition {
            record,
            resolution: Resolution::Classified { vector_id },
        }
    }

    async fn write_back(
        &self,
        record: &Record,
        record_id: i64,
        vector: Vec<f32>,
    ) -> Option<String> {
        debug!(stage = Stage::Writeback.as_str(), record_id);
        let threshold = self.config.similarity_threshold;
        let vector_id = vector_id_for_record(record_id);
        let metadata = EntryMetadata::from_record(record, threshold);

        if !self.vectors.insert(&vector_id, vector, metadata).await {
            warn!(record_id, "Cache write failed; record saved without a vector");
            return None;
        }

        let mapping = NewVectorMapping {
            record_id,
            vector_id: vector_id.clone(),
            similarity_threshold: threshold,
        };
        if let Err(e) = self.records.save_mapping(mapping).await {
            warn!(record_id, error = %e, "Could not save vector mapping");
        }

        Some(vector_id)
    }
}
