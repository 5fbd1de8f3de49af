//! Phyto library crate (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`Recognizer`], [`Recognition`], [`Resolution`] - The embedding-similarity cache policy
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`Record`] - Persisted recognition result
//!
//! ## Collaborators
//! - [`EmbeddingClient`], [`HttpEmbeddingClient`] - Image embedding
//! - [`ClassifierClient`], [`HttpClassifierClient`] - Image classification
//! - [`VectorStore`], [`VectorBackend`], [`QdrantStore`], [`ChromaStore`] - Nearest-neighbor storage
//! - [`RecordStore`], [`SqliteRecordStore`] - Record persistence
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod classifier;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod gateway;
pub mod recognition;
pub mod records;
pub mod remote;
pub mod vectordb;

pub use classifier::{Classification, ClassifierClient, ClassifierError, HttpClassifierClient};
pub use config::{Config, ConfigError, VectorBackendKind};
pub use constants::{
    DEFAULT_EMBEDDING_DIM, DEFAULT_SIMILARITY_THRESHOLD, RECOGNITION_FAILED_LABEL,
    UNKNOWN_LABEL, record_id_from_vector_id, vector_id_for_record,
};
pub use embedding::{EmbeddingClient, EmbeddingError, HttpEmbeddingClient};
pub use recognition::{Recognition, RecognizerConfig, Recognizer, Resolution, ServiceRecognizer};
pub use records::{
    NewRecord, NewVectorMapping, Record, RecordStore, RecordStoreError, SqliteRecordStore,
    VectorMapping,
};
pub use remote::RemoteEndpoint;
pub use vectordb::{
    ChromaStore, CollectionSpec, DistanceMetric, EntryMetadata, QdrantStore, SearchResult,
    VectorBackend, VectorStore, VectorStoreError,
};

#[cfg(any(test, feature = "mock"))]
pub use classifier::MockClassifierClient;
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbeddingClient;
#[cfg(any(test, feature = "mock"))]
pub use records::MockRecordStore;
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorStore;
