use tracing::warn;

use super::error::VectorStoreError;
use super::model::{EntryMetadata, SearchResult};

/// Nearest-neighbor store the recognition cache is built on.
///
/// Implementations never surface errors to the caller: writes report `false`
/// and a failed search is an empty result, both logged.
pub trait VectorStore: Send + Sync {
    /// Creates the collection if absent, otherwise checks it is servable. Idempotent.
    fn init_collection(&self) -> impl std::future::Future<Output = bool> + Send;

    /// Upserts one entry keyed by `vector_id`.
    fn insert(
        &self,
        vector_id: &str,
        vector: Vec<f32>,
        metadata: EntryMetadata,
    ) -> impl std::future::Future<Output = bool> + Send;

    /// At most `top_k` entries with similarity `>= threshold`, best first.
    fn search(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        threshold: f32,
    ) -> impl std::future::Future<Output = Vec<SearchResult>> + Send;

    /// Removes an entry. A missing id is not a failure.
    fn delete(&self, vector_id: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub(crate) fn settle_write(
    operation: &'static str,
    vector_id: &str,
    result: Result<(), VectorStoreError>,
) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(operation, vector_id, error = %e, "Vector store write failed");
            false
        }
    }
}

pub(crate) fn settle_search(
    result: Result<Vec<SearchResult>, VectorStoreError>,
) -> Vec<SearchResult> {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "Vector search failed; treating as no match");
        Vec::new()
    })
}

pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), VectorStoreError> {
    if vector.len() != expected {
        return Err(VectorStoreError::InvalidDimension {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
