//! Deterministic in-memory embedder for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::client::EmbeddingClient;
use super::error::EmbeddingError;

/// Embeds images by hashing their bytes into a pseudo-random unit vector.
///
/// Identical bytes always produce identical vectors; distinct bytes produce nearly
/// orthogonal ones. Specific images can be pinned to chosen vectors.
#[derive(Debug, Default)]
pub struct MockEmbeddingClient {
    dimension: usize,
    pinned: RwLock<HashMap<Vec<u8>, Vec<f32>>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    /// Makes `image` embed to `vector`.
    pub fn pin(&self, image: &[u8], vector: Vec<f32>) {
        self.pinned.write().insert(image.to_vec(), vector);
    }

    /// When set, every call returns [`EmbeddingError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingClient for MockEmbeddingClient {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, image: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if image.is_empty() {
            return Err(EmbeddingError::EmptyImage);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Unavailable {
                url: "mock:".to_string(),
                message: "embedding disabled".to_string(),
            });
        }

        if let Some(vector) = self.pinned.read().get(image) {
            return Ok(vector.clone());
        }

        Ok(hashed_unit_vector(image, self.dimension))
    }
}

/// Expands the blake3 XOF of `seed` into a unit-length vector of `dimension` floats.
pub fn hashed_unit_vector(seed: &[u8], dimension: usize) -> Vec<f32> {
    let mut reader = blake3::Hasher::new().update(seed).finalize_xof();
    let mut bytes = vec![0u8; dimension * 4];
    reader.fill(&mut bytes);

    let mut vector: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| {
            let bits = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            (bits as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
        })
        .collect();

    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}
