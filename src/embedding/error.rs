use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the embedding endpoint.
pub enum EmbeddingError {
    /// Caller passed no image bytes.
    #[error("cannot embed an empty image")]
    EmptyImage,

    /// Transport failure, timeout or non-success status.
    #[error("embedding service at '{url}' unavailable: {message}")]
    Unavailable {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Response body did not match any known shape.
    #[error("malformed embedding response: {reason}")]
    MalformedResponse {
        /// What was wrong with the body.
        reason: String,
    },

    /// Vector length differs from the deployment's dimensionality.
    #[error("invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },
}
