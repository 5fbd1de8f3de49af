use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::RECOGNITION_FAILED_LABEL;

/// A finalized recognition.
///
/// `id` is assigned by the store and never changes. It is `None` only for the
/// failure sentinel and for records whose save failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: Option<i64>,
    pub label: String,
    pub confidence: Option<f32>,
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Unsaved record stamped with the current time.
    pub fn unsaved(new: NewRecord) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            label: new.label,
            confidence: new.confidence,
            image_ref: new.image_ref,
            created_at: now,
            updated_at: now,
        }
    }

    /// Terminal result returned when the classifier could not be reached.
    pub fn recognition_failed() -> Self {
        Self::unsaved(NewRecord {
            label: RECOGNITION_FAILED_LABEL.to_string(),
            confidence: Some(0.0),
            image_ref: None,
        })
    }
}

/// Fields the caller supplies when creating a record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub label: String,
    pub confidence: Option<f32>,
    pub image_ref: Option<String>,
}

/// Persisted link from a vector id to the record it was written for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMapping {
    pub id: i64,
    pub record_id: i64,
    pub vector_id: String,
    pub similarity_threshold: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVectorMapping {
    pub record_id: i64,
    pub vector_id: String,
    pub similarity_threshold: f32,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RecordRow {
    pub id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub recognition_accuracy: Option<f64>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Self {
            id: Some(row.id),
            label: row.name,
            confidence: row.recognition_accuracy.map(|a| a as f32),
            image_ref: row.image_url,
            created_at: row.create_time,
            updated_at: row.update_time,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MappingRow {
    pub id: i64,
    pub plant_id: i64,
    pub vector_id: String,
    pub similarity_threshold: f64,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl From<MappingRow> for VectorMapping {
    fn from(row: MappingRow) -> Self {
        Self {
            id: row.id,
            record_id: row.plant_id,
            vector_id: row.vector_id,
            similarity_threshold: row.similarity_threshold as f32,
            created_at: row.create_time,
            updated_at: row.update_time,
        }
    }
}
