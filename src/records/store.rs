use super::error::RecordStoreError;
use super::model::{NewRecord, NewVectorMapping, Record, VectorMapping};

/// Durable storage for records and their vector mappings.
pub trait RecordStore: Send + Sync {
    /// Persists a new record; the store assigns `id` and timestamps.
    fn insert(
        &self,
        record: NewRecord,
    ) -> impl std::future::Future<Output = Result<Record, RecordStoreError>> + Send;

    fn get(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Record>, RecordStoreError>> + Send;

    /// Sets `image_ref` and refreshes `updated_at`. `None` if the record is gone.
    fn attach_image(
        &self,
        id: i64,
        image_ref: &str,
    ) -> impl std::future::Future<Output = Result<Option<Record>, RecordStoreError>> + Send;

    /// Newest first.
    fn recent(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Record>, RecordStoreError>> + Send;

    /// Upserts keyed by `vector_id`.
    fn save_mapping(
        &self,
        mapping: NewVectorMapping,
    ) -> impl std::future::Future<Output = Result<VectorMapping, RecordStoreError>> + Send;

    fn mapping_by_vector_id(
        &self,
        vector_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<VectorMapping>, RecordStoreError>> + Send;
}
