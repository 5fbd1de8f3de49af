use serde::Serialize;

use crate::config::Config;
use crate::constants::DEFAULT_SIMILARITY_THRESHOLD;
use crate::records::Record;

/// How a recognition was resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// A stored entry was similar enough; the classifier was not called.
    CacheHit { vector_id: String, score: f32 },
    /// The classifier was called. `vector_id` is set when the cache write succeeded.
    Classified { vector_id: Option<String> },
    /// The classifier was unreachable; the record is the failure sentinel.
    Failed,
}

/// Result of one recognition request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recognition {
    pub record: Record,
    pub resolution: Resolution,
}

impl Recognition {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.resolution, Resolution::CacheHit { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.resolution, Resolution::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognizerConfig {
    /// Minimum similarity for a cache hit, applied to every query.
    pub similarity_threshold: f32,
    /// Neighbors requested per search. Only the best one is used.
    pub top_k: usize,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            top_k: 1,
        }
    }
}

impl RecognizerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            ..Default::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

/// Pipeline stage, recorded on log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Embedding,
    Searching,
    Hit,
    Miss,
    Classifying,
    Persisting,
    Writeback,
}

impl Stage {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Stage::Embedding => "embedding",
            Stage::Searching => "searching",
            Stage::Hit => "hit",
            Stage::Miss => "miss",
            Stage::Classifying => "classifying",
            Stage::Persisting => "persisting",
            Stage::Writeback => "writeback",
        }
    }
}
