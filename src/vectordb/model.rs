use chrono::SecondsFormat;
use serde::{Deserialize, Deserializer, Serialize};

use crate::records::Record;

/// Distance function a collection is built with.
///
/// Backends report either a similarity or a distance; [`DistanceMetric::to_similarity`]
/// maps a distance onto "higher is more similar".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    InnerProduct,
    L2,
}

impl DistanceMetric {
    /// Accepts `cosine`, `ip`/`dot`/`inner_product` and `l2`/`euclid`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cosine" => Some(Self::Cosine),
            "ip" | "dot" | "inner_product" => Some(Self::InnerProduct),
            "l2" | "euclid" | "euclidean" => Some(Self::L2),
            _ => None,
        }
    }

    /// Value of Chroma's `hnsw:space` collection setting.
    pub fn chroma_space(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::InnerProduct => "ip",
            Self::L2 => "l2",
        }
    }

    /// Converts a distance into a similarity score.
    pub fn to_similarity(self, distance: f32) -> f32 {
        match self {
            Self::Cosine | Self::InnerProduct => 1.0 - distance,
            Self::L2 => 1.0 / (1.0 + distance.max(0.0)),
        }
    }
}

/// Collection a backend serves: name, fixed dimensionality and metric.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: DistanceMetric::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

/// Metadata stored next to each vector.
///
/// Every field is optional when reading so entries written by older deployments
/// (`plant_id`, `plant_name`, `image_url`, ...) still resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(
        default,
        alias = "plant_id",
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub record_id: Option<i64>,

    #[serde(default, alias = "plant_name", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(
        default,
        alias = "recognition_accuracy",
        deserialize_with = "lenient_f32",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f32>,

    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,

    #[serde(
        default,
        alias = "similarity_threshold",
        deserialize_with = "lenient_f32",
        skip_serializing_if = "Option::is_none"
    )]
    pub threshold: Option<f32>,

    #[serde(default, alias = "create_time", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, alias = "update_time", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl EntryMetadata {
    /// Snapshot of a persisted record plus the threshold it was written with.
    pub fn from_record(record: &Record, threshold: f32) -> Self {
        Self {
            record_id: record.id,
            label: Some(record.label.clone()),
            confidence: record.confidence,
            image_ref: record.image_ref.clone(),
            threshold: Some(threshold),
            created_at: Some(record.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            updated_at: Some(record.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IdRepr> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|r| match r {
        IdRepr::Int(i) => Some(i),
        IdRepr::Float(f) if f.fract() == 0.0 => Some(f as i64),
        IdRepr::Float(_) => None,
        IdRepr::Text(s) => s.trim().parse().ok(),
    }))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Number(f64),
    Text(String),
}

fn lenient_f32<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberRepr> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|r| match r {
        NumberRepr::Number(n) => Some(n as f32),
        NumberRepr::Text(s) => s.trim().parse().ok(),
    }))
}

/// One nearest-neighbor hit. `score` is a similarity: higher is closer.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub vector_id: String,
    pub score: f32,
    pub metadata: EntryMetadata,
}

/// Keeps results with `score >= threshold`, best first, at most `top_k`.
pub fn rank_results(
    mut results: Vec<SearchResult>,
    top_k: usize,
    threshold: f32,
) -> Vec<SearchResult> {
    results.retain(|r| r.score.is_finite() && r.score >= threshold);
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(top_k);
    results
}

/// Numeric point id for a vector id (first 8 bytes of its BLAKE3 hash).
#[inline]
pub fn point_id_for(vector_id: &str) -> u64 {
    let hash = blake3::hash(vector_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
