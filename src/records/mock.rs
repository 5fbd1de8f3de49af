//! In-memory record store for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;

use super::error::RecordStoreError;
use super::model::{NewRecord, NewVectorMapping, Record, VectorMapping};
use super::store::RecordStore;

#[derive(Debug, Default)]
pub struct MockRecordStore {
    records: RwLock<BTreeMap<i64, Record>>,
    mappings: RwLock<BTreeMap<String, VectorMapping>>,
    next_id: AtomicI64,
    fail_inserts: AtomicBool,
    fail_reads: AtomicBool,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `insert` and `save_mapping` fail.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes `get`, `recent` and mapping lookups fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Drops a record without touching the vector store (simulates a dangling entry).
    pub fn remove(&self, id: i64) -> Option<Record> {
        self.records.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.read().len()
    }

    fn check(flag: &AtomicBool, operation: &str) -> Result<(), RecordStoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Unavailable {
                message: format!("mock {operation} failure"),
            });
        }
        Ok(())
    }
}

impl RecordStore for MockRecordStore {
    async fn insert(&self, record: NewRecord) -> Result<Record, RecordStoreError> {
        Self::check(&self.fail_inserts, "insert")?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut saved = Record::unsaved(record);
        saved.id = Some(id);
        self.records.write().insert(id, saved.clone());
        Ok(saved)
    }

    async fn get(&self, id: i64) -> Result<Option<Record>, RecordStoreError> {
        Self::check(&self.fail_reads, "get")?;
        Ok(self.records.read().get(&id).cloned())
    }

    async fn attach_image(
        &self,
        id: i64,
        image_ref: &str,
    ) -> Result<Option<Record>, RecordStoreError> {
        Self::check(&self.fail_inserts, "attach image")?;
        let mut records = self.records.write();
        Ok(records.get_mut(&id).map(|record| {
            record.image_ref = Some(image_ref.to_string());
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Record>, RecordStoreError> {
        Self::check(&self.fail_reads, "recent")?;
        Ok(self
            .records
            .read()
            .values()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn save_mapping(
        &self,
        mapping: NewVectorMapping,
    ) -> Result<VectorMapping, RecordStoreError> {
        Self::check(&self.fail_inserts, "save mapping")?;
        let now = Utc::now();
        let mut mappings = self.mappings.write();
        let next_id = mappings.len() as i64 + 1;
        let entry = mappings
            .entry(mapping.vector_id.clone())
            .or_insert_with(|| VectorMapping {
                id: next_id,
                record_id: mapping.record_id,
                vector_id: mapping.vector_id.clone(),
                similarity_threshold: mapping.similarity_threshold,
                created_at: now,
                updated_at: now,
            });
        entry.record_id = mapping.record_id;
        entry.similarity_threshold = mapping.similarity_threshold;
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn mapping_by_vector_id(
        &self,
        vector_id: &str,
    ) -> Result<Option<VectorMapping>, RecordStoreError> {
        Self::check(&self.fail_reads, "mapping lookup")?;
        Ok(self.mappings.read().get(vector_id).cloned())
    }
}
