use crate::config::{Config, VectorBackendKind};

use super::chroma::ChromaStore;
use super::error::VectorStoreError;
use super::model::{CollectionSpec, EntryMetadata, SearchResult};
use super::qdrant::QdrantStore;
use super::store::VectorStore;

#[cfg(any(test, feature = "mock"))]
use super::mock::MockVectorStore;

/// Vector store selected at runtime (Qdrant, Chroma or mock).
pub enum VectorBackend {
    /// Qdrant over gRPC.
    Qdrant(QdrantStore),
    /// Chroma over REST.
    Chroma(ChromaStore),
    #[cfg(any(test, feature = "mock"))]
    /// In-memory mock backend.
    Mock(MockVectorStore),
}

impl VectorBackend {
    /// Builds the backend named by `config.vector_backend` (`mock` requires the `mock` feature).
    pub async fn from_config(config: &Config) -> Result<Self, VectorStoreError> {
        let spec = CollectionSpec::new(config.collection_name.clone(), config.embedding_dim)
            .with_metric(config.distance_metric);

        match config.vector_backend {
            VectorBackendKind::Qdrant => {
                let store = QdrantStore::new(&config.qdrant_url, spec).await?;
                Ok(Self::Qdrant(store))
            }
            VectorBackendKind::Chroma => Ok(Self::Chroma(ChromaStore::new(
                &config.chroma_url,
                spec,
                config.connect_timeout,
                config.request_timeout,
            ))),
            VectorBackendKind::Mock => {
                #[cfg(any(test, feature = "mock"))]
                {
                    Ok(Self::Mock(MockVectorStore::new(spec)))
                }
                #[cfg(not(any(test, feature = "mock")))]
                {
                    let _ = spec;
                    Err(VectorStoreError::ConnectionFailed {
                        url: config.vector_store_url().to_string(),
                        message: "Mock backend not enabled. Compile with --features mock"
                            .to_string(),
                    })
                }
            }
        }
    }

    /// Short backend name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            VectorBackend::Qdrant(_) => "qdrant",
            VectorBackend::Chroma(_) => "chroma",
            #[cfg(any(test, feature = "mock"))]
            VectorBackend::Mock(_) => "mock",
        }
    }

    pub fn spec(&self) -> &CollectionSpec {
        match self {
            VectorBackend::Qdrant(s) => s.spec(),
            VectorBackend::Chroma(s) => s.spec(),
            #[cfg(any(test, feature = "mock"))]
            VectorBackend::Mock(s) => s.spec(),
        }
    }
}

impl VectorStore for VectorBackend {
    async fn init_collection(&self) -> bool {
        match self {
            VectorBackend::Qdrant(s) => s.init_collection().await,
            VectorBackend::Chroma(s) => s.init_collection().await,
            #[cfg(any(test, feature = "mock"))]
            VectorBackend::Mock(s) => s.init_collection().await,
        }
    }

    async fn insert(&self, vector_id: &str, vector: Vec<f32>, metadata: EntryMetadata) -> bool {
        match self {
            VectorBackend::Qdrant(s) => s.insert(vector_id, vector, metadata).await,
            VectorBackend::Chroma(s) => s.insert(vector_id, vector, metadata).await,
            #[cfg(any(test, feature = "mock"))]
            VectorBackend::Mock(s) => s.insert(vector_id, vector, metadata).await,
        }
    }

    async fn search(&self, vector: Vec<f32>, top_k: usize, threshold: f32) -> Vec<SearchResult> {
        match self {
            VectorBackend::Qdrant(s) => s.search(vector, top_k, threshold).await,
            VectorBackend::Chroma(s) => s.search(vector, top_k, threshold).await,
            #[cfg(any(test, feature = "mock"))]
            VectorBackend::Mock(s) => s.search(vector, top_k, threshold).await,
        }
    }

    async fn delete(&self, vector_id: &str) -> bool {
        match self {
            VectorBackend::Qdrant(s) => s.delete(vector_id).await,
            VectorBackend::Chroma(s) => s.delete(vector_id).await,
            #[cfg(any(test, feature = "mock"))]
            VectorBackend::Mock(s) => s.delete(vector_id).await,
        }
    }
}
