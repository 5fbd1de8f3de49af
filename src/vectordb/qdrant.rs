//! Qdrant backend over the native gRPC protocol.

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, HnswConfigDiffBuilder, PointStruct,
    PointsIdsList, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value,
    VectorParamsBuilder,
};
use tracing::{debug, info, instrument, warn};

use super::error::VectorStoreError;
use super::model::{
    CollectionSpec, DistanceMetric, EntryMetadata, SearchResult, point_id_for, rank_results,
};
use super::store::{VectorStore, check_dimension, settle_search, settle_write};

const HNSW_M: u64 = 16;
const HNSW_EF_CONSTRUCT: u64 = 64;

/// Payload key holding the string vector id (points are keyed by its hash).
const VECTOR_ID_KEY: &str = "vector_id";

#[derive(Clone)]
/// Qdrant-backed [`VectorStore`].
pub struct QdrantStore {
    client: Qdrant,
    url: String,
    spec: CollectionSpec,
}

impl QdrantStore {
    /// Creates a client for `url`. No request is made until first use.
    pub async fn new(url: &str, spec: CollectionSpec) -> Result<Self, VectorStoreError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorStoreError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            client,
            url: url.to_string(),
            spec,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    pub async fn health_check(&self) -> Result<(), VectorStoreError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorStoreError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn distance(&self) -> Distance {
        match self.spec.metric {
            DistanceMetric::Cosine => Distance::Cosine,
            DistanceMetric::InnerProduct => Distance::Dot,
            DistanceMetric::L2 => Distance::Euclid,
        }
    }

    fn collection_error(&self, e: impl ToString) -> VectorStoreError {
        VectorStoreError::CreateCollectionFailed {
            collection: self.spec.name.clone(),
            message: e.to_string(),
        }
    }

    /// Creates the collection when it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        let name = &self.spec.name;
        let exists = self
            .client
            .collection_exists(name.as_str())
            .await
            .map_err(|e| self.collection_error(e))?;

        if exists {
            debug!(collection = %name, "Collection already exists");
            return Ok(());
        }

        let vectors_config = VectorParamsBuilder::new(self.spec.dimension as u64, self.distance());
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(vectors_config)
                    .hnsw_config(
                        HnswConfigDiffBuilder::default()
                            .m(HNSW_M)
                            .ef_construct(HNSW_EF_CONSTRUCT),
                    ),
            )
            .await
            .map_err(|e| self.collection_error(e))?;

        info!(collection = %name, dimension = self.spec.dimension, "Created collection");
        Ok(())
    }

    pub async fn upsert(
        &self,
        vector_id: &str,
        vector: Vec<f32>,
        metadata: &EntryMetadata,
    ) -> Result<(), VectorStoreError> {
        check_dimension(self.spec.dimension, &vector)?;

        let point = PointStruct::new(
            point_id_for(vector_id),
            vector,
            metadata_to_payload(vector_id, metadata),
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.spec.name, vec![point]).wait(true))
            .await
            .map_err(|e| VectorStoreError::UpsertFailed {
                collection: self.spec.name.clone(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    pub async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        check_dimension(self.spec.dimension, &vector)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let request = search_request(&self.spec, vector, top_k, threshold);
        let response = self.client.search_points(request).await.map_err(|e| {
            VectorStoreError::SearchFailed {
                collection: self.spec.name.clone(),
                message: e.to_string(),
            }
        })?;

        let results = response
            .result
            .into_iter()
            .filter_map(|p| scored_point_to_result(self.spec.metric, p))
            .collect();

        Ok(rank_results(results, top_k, threshold))
    }

    pub async fn remove(&self, vector_id: &str) -> Result<(), VectorStoreError> {
        let selector = PointsIdsList {
            ids: vec![point_id_for(vector_id).into()],
        };

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.spec.name)
                    .points(selector)
                    .wait(true),
            )
            .await
            .map_err(|e| VectorStoreError::DeleteFailed {
                collection: self.spec.name.clone(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

impl VectorStore for QdrantStore {
    #[instrument(skip(self), fields(collection = %self.spec.name))]
    async fn init_collection(&self) -> bool {
        match self.ensure_collection().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Collection initialization failed");
                false
            }
        }
    }

    async fn insert(&self, vector_id: &str, vector: Vec<f32>, metadata: EntryMetadata) -> bool {
        settle_write("insert", vector_id, self.upsert(vector_id, vector, &metadata).await)
    }

    async fn search(&self, vector: Vec<f32>, top_k: usize, threshold: f32) -> Vec<SearchResult> {
        settle_search(self.query(vector, top_k, threshold).await)
    }

    async fn delete(&self, vector_id: &str) -> bool {
        settle_write("delete", vector_id, self.remove(vector_id).await)
    }
}

fn search_request(
    spec: &CollectionSpec,
    vector: Vec<f32>,
    top_k: usize,
    threshold: f32,
) -> SearchPointsBuilder {
    let builder = SearchPointsBuilder::new(&spec.name, vector, top_k as u64).with_payload(true);
    // Euclid scores are distances, so the server-side cut only applies to similarities.
    match spec.metric {
        DistanceMetric::L2 => builder,
        DistanceMetric::Cosine | DistanceMetric::InnerProduct => builder.score_threshold(threshold),
    }
}

/// Points without a `vector_id` payload were not written by this store and are skipped.
fn scored_point_to_result(metric: DistanceMetric, point: ScoredPoint) -> Option<SearchResult> {
    let payload = point.payload;
    let vector_id = payload.get(VECTOR_ID_KEY)?.as_str()?.to_string();

    let score = match metric {
        DistanceMetric::L2 => metric.to_similarity(point.score),
        DistanceMetric::Cosine | DistanceMetric::InnerProduct => point.score,
    };

    Some(SearchResult {
        vector_id,
        score,
        metadata: metadata_from_payload(&payload),
    })
}

fn metadata_to_payload(vector_id: &str, metadata: &EntryMetadata) -> HashMap<String, Value> {
    let mut payload: HashMap<String, Value> = HashMap::new();
    payload.insert(VECTOR_ID_KEY.to_string(), vector_id.to_string().into());
    if let Some(id) = metadata.record_id {
        payload.insert("record_id".to_string(), id.into());
    }
    if let Some(label) = &metadata.label {
        payload.insert("label".to_string(), label.clone().into());
    }
    if let Some(confidence) = metadata.confidence {
        payload.insert("confidence".to_string(), f64::from(confidence).into());
    }
    if let Some(image_ref) = &metadata.image_ref {
        payload.insert("image_ref".to_string(), image_ref.clone().into());
    }
    if let Some(threshold) = metadata.threshold {
        payload.insert("threshold".to_string(), f64::from(threshold).into());
    }
    if let Some(created_at) = &metadata.created_at {
        payload.insert("created_at".to_string(), created_at.clone().into());
    }
    if let Some(updated_at) = &metadata.updated_at {
        payload.insert("updated_at".to_string(), updated_at.clone().into());
    }
    payload
}

fn metadata_from_payload(payload: &HashMap<String, Value>) -> EntryMetadata {
    let field = |keys: &[&str]| keys.iter().find_map(|k| payload.get(*k));
    let string = |keys: &[&str]| field(keys).and_then(|v| v.as_str()).map(|s| s.to_string());
    let number = |keys: &[&str]| {
        field(keys).and_then(|v| {
            v.as_double()
                .or_else(|| v.as_integer().map(|i| i as f64))
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
    };

    let record_id = field(&["record_id", "plant_id"]).and_then(|v| {
        v.as_integer()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    });

    EntryMetadata {
        record_id,
        label: string(&["label", "plant_name"]),
        confidence: number(&["confidence", "recognition_accuracy"]).map(|n| n as f32),
        image_ref: string(&["image_ref", "image_url"]),
        threshold: number(&["threshold", "similarity_threshold"]).map(|n| n as f32),
        created_at: string(&["created_at", "create_time"]),
        updated_at: string(&["updated_at", "update_time"]),
    }
}
