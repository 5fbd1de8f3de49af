use reqwest::Client as HttpClient;
use serde::Serialize;
use tracing::{debug, instrument};

use super::error::ClassifierError;
use super::model::{Classification, parse_classifier_response};
use crate::remote::{RemoteEndpoint, encode_image};

/// Turns raw image bytes into a label and confidence.
pub trait ClassifierClient: Send + Sync {
    fn classify(
        &self,
        image: &[u8],
    ) -> impl std::future::Future<Output = Result<Classification, ClassifierError>> + Send;
}

#[derive(Debug, Serialize)]
struct ClassifyRequest {
    image: String,
    top_k: u32,
}

#[derive(Debug, Clone)]
/// Classifier client for the remote recognition endpoint.
pub struct HttpClassifierClient {
    endpoint: RemoteEndpoint,
    http: HttpClient,
}

impl HttpClassifierClient {
    pub fn new(endpoint: RemoteEndpoint) -> Self {
        let http = endpoint.http_client();
        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    fn unavailable(&self, message: impl Into<String>) -> ClassifierError {
        ClassifierError::Unavailable {
            url: self.endpoint.url.clone(),
            message: message.into(),
        }
    }
}

impl ClassifierClient for HttpClassifierClient {
    #[instrument(skip(self, image), fields(image_len = image.len()))]
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError> {
        if image.is_empty() {
            return Err(ClassifierError::EmptyImage);
        }

        let body = ClassifyRequest {
            image: encode_image(image),
            top_k: 1,
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

        let classification = parse_classifier_response(&bytes)?;
        debug!(
            label = %classification.label,
            confidence = classification.confidence,
            "Image classified"
        );
        Ok(classification)
    }
}
