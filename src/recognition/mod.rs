//! The recognition pipeline: embedding lookup first, classifier on a miss.

pub mod model;
pub mod recognizer;

#[cfg(test)]
mod tests;

pub use model::{Recognition, RecognizerConfig, Resolution};
pub use recognizer::Recognizer;

use crate::classifier::HttpClassifierClient;
use crate::embedding::HttpEmbeddingClient;
use crate::records::SqliteRecordStore;
use crate::vectordb::VectorBackend;

/// Recognizer wired to the production collaborators.
pub type ServiceRecognizer =
    Recognizer<HttpEmbeddingClient, HttpClassifierClient, VectorBackend, SqliteRecordStore>;
