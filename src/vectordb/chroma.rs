//! Chroma backend over its v1 REST API.
//!
//! The collection is created with `get_or_create` and addressed by the id Chroma
//! hands back. That id is resolved on first use and cached for the life of the store.

use std::time::Duration;

use reqwest::{Client as HttpClient, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::error::VectorStoreError;
use super::model::{CollectionSpec, EntryMetadata, SearchResult, rank_results};
use super::store::{VectorStore, check_dimension, settle_search, settle_write};
use crate::remote::build_http_client;

/// Chroma-backed [`VectorStore`].
pub struct ChromaStore {
    base_url: String,
    http: HttpClient,
    spec: CollectionSpec,
    collection_id: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    ids: [&'a str; 1],
    embeddings: [Vec<f32>; 1],
    metadatas: [&'a EntryMetadata; 1],
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    query_embeddings: [Vec<f32>; 1],
    n_results: usize,
    include: [&'static str; 2],
}

/// Query results are nested one level per query embedding.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Value>>>>,
}

impl ChromaStore {
    pub fn new(
        url: &str,
        spec: CollectionSpec,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            http: build_http_client(connect_timeout, request_timeout),
            spec,
            collection_id: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    fn collection_url(&self, id: &str, action: &str) -> String {
        format!("{}/api/v1/collections/{id}/{action}", self.base_url)
    }

    pub async fn heartbeat(&self) -> Result<(), VectorStoreError> {
        let url = format!("{}/api/v1/heartbeat", self.base_url);
        let connection_failed = |message: String| VectorStoreError::ConnectionFailed {
            url: self.base_url.clone(),
            message,
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| connection_failed(e.to_string()))?;
        ensure_success(response).await.map_err(connection_failed)?;
        Ok(())
    }

    /// Resolves (and caches) the collection id, creating the collection if needed.
    pub async fn collection_id(&self) -> Result<&str, VectorStoreError> {
        let id = self
            .collection_id
            .get_or_try_init(|| self.get_or_create_collection())
            .await?;
        Ok(id.as_str())
    }

    async fn get_or_create_collection(&self) -> Result<String, VectorStoreError> {
        let failed = |message: String| VectorStoreError::CreateCollectionFailed {
            collection: self.spec.name.clone(),
            message,
        };

        let body = json!({
            "name": self.spec.name,
            "metadata": {"hnsw:space": self.spec.metric.chroma_space()},
            "get_or_create": true,
        });

        let response = self
            .http
            .post(format!("{}/api/v1/collections", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let response = ensure_success(response).await.map_err(failed)?;

        let collection: CollectionResponse =
            response
                .json()
                .await
                .map_err(|e| VectorStoreError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        info!(collection = %self.spec.name, id = %collection.id, "Resolved Chroma collection");
        Ok(collection.id)
    }

    /// Creates the collection when absent; pings the server when already resolved.
    pub async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        if self.collection_id.initialized() {
            return self.heartbeat().await;
        }
        self.collection_id().await.map(|_| ())
    }

    pub async fn upsert(
        &self,
        vector_id: &str,
        vector: Vec<f32>,
        metadata: &EntryMetadata,
    ) -> Result<(), VectorStoreError> {
        check_dimension(self.spec.dimension, &vector)?;
        let failed = |message: String| VectorStoreError::UpsertFailed {
            collection: self.spec.name.clone(),
            message,
        };

        let id = self.collection_id().await?;
        let body = UpsertRequest {
            ids: [vector_id],
            embeddings: [vector],
            metadatas: [metadata],
        };

        let response = self
            .http
            .post(self.collection_url(id, "upsert"))
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        ensure_success(response).await.map_err(failed)?;
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
        let failed = |message: String| VectorStoreError::SearchFailed {
            collection: self.spec.name.clone(),
            message,
        };

        let id = self.collection_id().await?;
        let body = QueryRequest {
            query_embeddings: [vector],
            n_results: top_k,
            include: ["metadatas", "distances"],
        };

        let response = self
            .http
            .post(self.collection_url(id, "query"))
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let response = ensure_success(response).await.map_err(failed)?;

        let parsed: QueryResponse =
            response
                .json()
                .await
                .map_err(|e| VectorStoreError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        Ok(rank_results(self.collect_hits(parsed), top_k, threshold))
    }

    fn collect_hits(&self, response: QueryResponse) -> Vec<SearchResult> {
        let ids = response.ids.into_iter().next().unwrap_or_default();
        let distances = response
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let mut metadatas = response
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default()
            .into_iter();

        ids.into_iter()
            .zip(distances)
            .filter_map(|(vector_id, distance)| {
                let metadata = metadatas.next().flatten();
                let distance = distance?;
                Some(SearchResult {
                    score: self.spec.metric.to_similarity(distance),
                    metadata: decode_metadata(&vector_id, metadata),
                    vector_id,
                })
            })
            .collect()
    }

    pub async fn remove(&self, vector_id: &str) -> Result<(), VectorStoreError> {
        let failed = |message: String| VectorStoreError::DeleteFailed {
            collection: self.spec.name.clone(),
            message,
        };

        let id = self.collection_id().await?;
        let response = self
            .http
            .post(self.collection_url(id, "delete"))
            .json(&json!({ "ids": [vector_id] }))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        ensure_success(response).await.map_err(failed)?;
        Ok(())
    }
}

impl VectorStore for ChromaStore {
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

async fn ensure_success(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("status {status}: {body}"))
}

fn decode_metadata(vector_id: &str, raw: Option<Value>) -> EntryMetadata {
    let Some(raw) = raw else {
        return EntryMetadata::default();
    };
    serde_json::from_value(raw).unwrap_or_else(|e| {
        debug!(vector_id, error = %e, "Unreadable entry metadata");
        EntryMetadata::default()
    })
}
