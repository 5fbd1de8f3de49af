//! Scripted classifier for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::client::ClassifierClient;
use super::error::ClassifierError;
use super::model::Classification;

/// Answers with a per-image scripted label, or a default one.
#[derive(Debug)]
pub struct MockClassifierClient {
    default: Classification,
    scripted: RwLock<HashMap<Vec<u8>, Classification>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl Default for MockClassifierClient {
    fn default() -> Self {
        Self::new(Classification::new("Rose", 0.93))
    }
}

impl MockClassifierClient {
    pub fn new(default: Classification) -> Self {
        Self {
            default,
            scripted: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, image: &[u8], classification: Classification) {
        self.scripted.write().insert(image.to_vec(), classification);
    }

    /// When set, every call returns [`ClassifierError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClassifierClient for MockClassifierClient {
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(ClassifierError::Unavailable {
                url: "mock:".to_string(),
                message: "timed out".to_string(),
            });
        }

        Ok(self
            .scripted
            .read()
            .get(image)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}
