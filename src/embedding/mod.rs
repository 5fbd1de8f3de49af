//! Image embedding via the remote embedding endpoint.
//!
//! Failure policy: errors are surfaced as [`EmbeddingError`] rather than replaced by a
//! neutral vector. The recognizer treats any error as a cache miss and skips the
//! vector write for that request.

pub mod client;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use client::{EmbeddingClient, HttpEmbeddingClient};
pub use error::EmbeddingError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbeddingClient, hashed_unit_vector};
