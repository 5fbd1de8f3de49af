use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::EmbeddingError;
use crate::remote::{RemoteEndpoint, encode_image};

/// Turns raw image bytes into a fixed-length vector.
pub trait EmbeddingClient: Send + Sync {
    /// Dimensionality every returned vector has.
    fn dimension(&self) -> usize;

    /// Embeds one image.
    fn embed(
        &self,
        image: &[u8],
    ) -> impl std::future::Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    image: String,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Accepted response bodies: `{embedding: [..]}` or `{data: [{embedding: [..]}]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Flat { embedding: Vec<f32> },
    Data { data: Vec<EmbeddingDatum> },
}

impl EmbedResponse {
    fn into_vector(self) -> Result<Vec<f32>, EmbeddingError> {
        match self {
            EmbedResponse::Flat { embedding } => Ok(embedding),
            EmbedResponse::Data { data } => data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .ok_or_else(|| EmbeddingError::MalformedResponse {
                    reason: "empty data list".to_string(),
                }),
        }
    }
}

#[derive(Debug, Clone)]
/// Embedding client for the remote image-embedding endpoint.
pub struct HttpEmbeddingClient {
    endpoint: RemoteEndpoint,
    model: String,
    dimension: usize,
    http: HttpClient,
}

impl HttpEmbeddingClient {
    pub fn new(endpoint: RemoteEndpoint, model: impl Into<String>, dimension: usize) -> Self {
        let http = endpoint.http_client();
        Self {
            endpoint,
            model: model.into(),
            dimension,
            http,
        }
    }

    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    fn unavailable(&self, message: impl Into<String>) -> EmbeddingError {
        EmbeddingError::Unavailable {
            url: self.endpoint.url.clone(),
            message: message.into(),
        }
    }
}

impl EmbeddingClient for HttpEmbeddingClient {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[instrument(skip(self, image), fields(image_len = image.len()))]
    async fn embed(&self, image: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
        if image.is_empty() {
            return Err(EmbeddingError::EmptyImage);
        }

        let body = EmbedRequest {
            image: encode_image(image),
            model: &self.model,
        };

        let response = self
            .endpoint
            .post(&self.http)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("status {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let parsed: EmbedResponse =
            serde_json::from_slice(&bytes).map_err(|e| EmbeddingError::MalformedResponse {
                reason: e.to_string(),
            })?;
        let vector = parsed.into_vector()?;

        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        debug!(dim = vector.len(), "Image embedded");
        Ok(vector)
    }
}
