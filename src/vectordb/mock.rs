//! In-memory vector store for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::error::VectorStoreError;
use super::model::{CollectionSpec, DistanceMetric, EntryMetadata, SearchResult, rank_results};
use super::store::{VectorStore, check_dimension, settle_search, settle_write};

#[derive(Clone)]
struct StoredEntry {
    vector: Vec<f32>,
    metadata: EntryMetadata,
}

/// Brute-force [`VectorStore`] with switchable failures.
pub struct MockVectorStore {
    spec: CollectionSpec,
    entries: RwLock<HashMap<String, StoredEntry>>,
    initialized: AtomicBool,
    fail_writes: AtomicBool,
    fail_search: AtomicBool,
}

impl MockVectorStore {
    pub fn new(spec: CollectionSpec) -> Self {
        Self {
            spec,
            entries: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_search: AtomicBool::new(false),
        }
    }

    pub fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, vector_id: &str) -> bool {
        self.entries.read().contains_key(vector_id)
    }

    pub fn metadata(&self, vector_id: &str) -> Option<EntryMetadata> {
        self.entries.read().get(vector_id).map(|e| e.metadata.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Makes `insert`, `delete` and `init_collection` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `search` fail (and therefore return nothing).
    pub fn set_fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    fn write_guard(&self, operation: &str) -> Result<(), VectorStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VectorStoreError::UpsertFailed {
                collection: self.spec.name.clone(),
                message: format!("mock {operation} failure"),
            });
        }
        Ok(())
    }

    pub fn upsert(
        &self,
        vector_id: &str,
        vector: Vec<f32>,
        metadata: EntryMetadata,
    ) -> Result<(), VectorStoreError> {
        self.write_guard("insert")?;
        check_dimension(self.spec.dimension, &vector)?;
        self.entries
            .write()
            .insert(vector_id.to_string(), StoredEntry { vector, metadata });
        Ok(())
    }

    pub fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(VectorStoreError::SearchFailed {
                collection: self.spec.name.clone(),
                message: "mock search failure".to_string(),
            });
        }
        check_dimension(self.spec.dimension, vector)?;

        let results = self
            .entries
            .read()
            .iter()
            .map(|(id, entry)| SearchResult {
                vector_id: id.clone(),
                score: similarity(self.spec.metric, vector, &entry.vector),
                metadata: entry.metadata.clone(),
            })
            .collect();

        Ok(rank_results(results, top_k, threshold))
    }
}

impl VectorStore for MockVectorStore {
    async fn init_collection(&self) -> bool {
        match self.write_guard("init") {
            Ok(()) => {
                self.initialized.store(true, Ordering::SeqCst);
                true
            }
            Err(_) => false,
        }
    }

    async fn insert(&self, vector_id: &str, vector: Vec<f32>, metadata: EntryMetadata) -> bool {
        settle_write("insert", vector_id, self.upsert(vector_id, vector, metadata))
    }

    async fn search(&self, vector: Vec<f32>, top_k: usize, threshold: f32) -> Vec<SearchResult> {
        settle_search(self.query(&vector, top_k, threshold))
    }

    async fn delete(&self, vector_id: &str) -> bool {
        let result = self.write_guard("delete").map(|()| {
            self.entries.write().remove(vector_id);
        });
        settle_write("delete", vector_id, result)
    }
}

fn similarity(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::InnerProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        DistanceMetric::L2 => {
            let d = a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt();
            metric.to_similarity(d)
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
