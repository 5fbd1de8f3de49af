//! Vector store backends for the recognition cache.
//!
//! [`VectorStore`] is the capability the recognizer depends on. [`QdrantStore`] and
//! [`ChromaStore`] are the production backends; [`VectorBackend`] picks one from
//! configuration. Scores are always similarities in `[0, 1]`-ish space where higher
//! is closer; distance metrics are converted at the backend boundary.

pub mod backend;
pub mod chroma;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod qdrant;
pub mod store;


pub use backend::VectorBackend;
pub use chroma::ChromaStore;
pub use error::VectorStoreError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockVectorStore, cosine_similarity};
pub use model::{
    CollectionSpec, DistanceMetric, EntryMetadata, SearchResult, point_id_for, rank_results,
};
pub use qdrant::QdrantStore;
pub use store::VectorStore;
