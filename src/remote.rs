//! Shared plumbing for the remote model endpoints (embedding + classification).
//!
//! Both endpoints take `{image: <base64>, ...params}` and authenticate with a bearer token.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client as HttpClient;
use tracing::error;

use crate::config::Config;

/// Connection settings for one remote model endpoint.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    pub url: String,
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl RemoteEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Embedding endpoint described by `config`.
    pub fn embedding(config: &Config) -> Self {
        Self::new(config.embedding_url.clone())
            .with_api_key(config.api_key.clone())
            .with_timeouts(config.connect_timeout, config.request_timeout)
    }

    /// Classification endpoint described by `config`.
    pub fn classifier(config: &Config) -> Self {
        Self::new(config.classifier_url.clone())
            .with_api_key(config.api_key.clone())
            .with_timeouts(config.connect_timeout, config.request_timeout)
    }

    /// Builds an HTTP client honoring the endpoint's timeouts.
    pub fn http_client(&self) -> HttpClient {
        build_http_client(self.connect_timeout, self.request_timeout)
    }

    /// Starts a JSON POST to the endpoint with the bearer token attached (if any).
    pub fn post(&self, http: &HttpClient) -> reqwest::RequestBuilder {
        let request = http.post(&self.url);
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

pub fn try_build_http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<HttpClient, reqwest::Error> {
    HttpClient::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
}

/// Like [`try_build_http_client`], but falls back to a default client (logged) when
/// the TLS backend cannot be initialized.
pub fn build_http_client(connect_timeout: Duration, request_timeout: Duration) -> HttpClient {
    try_build_http_client(connect_timeout, request_timeout).unwrap_or_else(|e| {
        error!(
            error = %e,
            connect_timeout_ms = connect_timeout.as_millis() as u64,
            request_timeout_ms = request_timeout.as_millis() as u64,
            "HTTP client builder failed; falling back to a client without timeouts"
        );
        HttpClient::new()
    })
}

pub fn encode_image(image: &[u8]) -> String {
    STANDARD.encode(image)
}
