//! Image classification via the remote recognition endpoint.
//!
//! The service may answer with one prediction object or a list of them; optional
//! fields never fail a request. Missing labels read as `"unknown"`, missing or
//! non-numeric confidences as `0.0`.

pub mod client;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;


pub use client::{ClassifierClient, HttpClassifierClient};
pub use error::ClassifierError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockClassifierClient;
pub use model::{Classification, parse_classifier_response};
