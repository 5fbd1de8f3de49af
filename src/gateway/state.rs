use std::path::PathBuf;
use std::sync::Arc;

use crate::recognition::Recognizer;

/// Shared state handed to every handler.
pub struct HandlerState<E, C, V, R> {
    pub recognizer: Arc<Recognizer<E, C, V, R>>,

    /// Directory uploaded images are written to.
    pub storage_path: PathBuf,
}

impl<E, C, V, R> HandlerState<E, C, V, R> {
    pub fn new(recognizer: Arc<Recognizer<E, C, V, R>>, storage_path: PathBuf) -> Self {
        Self {
            recognizer,
            storage_path,
        }
    }
}

impl<E, C, V, R> Clone for HandlerState<E, C, V, R> {
    fn clone(&self) -> Self {
        Self {
            recognizer: Arc::clone(&self.recognizer),
            storage_path: self.storage_path.clone(),
        }
    }
}
