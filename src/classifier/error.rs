use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the classification endpoint.
pub enum ClassifierError {
    /// Caller passed no image bytes.
    #[error("cannot classify an empty image")]
    EmptyImage,

    /// Transport failure, timeout or non-success status.
    #[error("classifier at '{url}' unavailable: {message}")]
    Unavailable {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Response body had no usable `result`.
    #[error("malformed classifier response: {reason}")]
    MalformedResponse {
        /// What was wrong with the body.
        reason: String,
    },
}
