//! Cross-cutting, shared constants.
//!
//! The embedding dimension is fixed per deployment. [`DEFAULT_EMBEDDING_DIM`] is the
//! default; runtime configuration passes the real value through
//! [`Config::embedding_dim`](crate::config::Config::embedding_dim) and every vector
//! backend validates against it at its boundary.

pub const DEFAULT_EMBEDDING_DIM: usize = 512;

/// Minimum normalized similarity for a stored entry to count as a cache hit.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.8;

/// Prefix of every vector id. The suffix is the owning record's id.
pub const VECTOR_ID_PREFIX: &str = "rec_";

/// Label used when the classifier omitted one.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Label of the terminal sentinel returned when the classifier is unreachable.
pub const RECOGNITION_FAILED_LABEL: &str = "recognition-failed";

pub const DEFAULT_COLLECTION_NAME: &str = "plant_collection";

pub const DEFAULT_RECENT_LIMIT: u32 = 10;
pub const MAX_RECENT_LIMIT: u32 = 100;

/// Builds the deterministic vector id for a record.
pub fn vector_id_for_record(record_id: i64) -> String {
    format!("{VECTOR_ID_PREFIX}{record_id}")
}

/// Parses a record id back out of a vector id produced by [`vector_id_for_record`].
pub fn record_id_from_vector_id(vector_id: &str) -> Option<i64> {
    vector_id.strip_prefix(VECTOR_ID_PREFIX)?.parse().ok()
}
