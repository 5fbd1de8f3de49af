//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `PHYTO_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_COLLECTION_NAME, DEFAULT_EMBEDDING_DIM, DEFAULT_SIMILARITY_THRESHOLD};
use crate::vectordb::DistanceMetric;

/// Which vector store implementation serves the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackendKind {
    /// Qdrant over its native gRPC protocol.
    Qdrant,
    /// Chroma over its REST API.
    Chroma,
    /// In-memory store (requires the `mock` feature).
    Mock,
}

impl FromStr for VectorBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "chroma" => Ok(Self::Chroma),
            "mock" => Ok(Self::Mock),
            _ => Err(ConfigError::UnknownBackend {
                value: s.to_string(),
            }),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `PHYTO_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Directory uploaded images are written to. Default: `./uploads`.
    pub storage_path: PathBuf,

    /// SQLite database file for records. Default: `./.data/phyto.db`.
    pub database_path: PathBuf,

    /// Vector store implementation. Default: Qdrant.
    pub vector_backend: VectorBackendKind,

    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Chroma endpoint URL. Default: `http://localhost:8000`.
    pub chroma_url: String,

    /// Collection holding the image embeddings.
    pub collection_name: String,

    /// Embedding dimensionality, fixed per deployment. Default: `512`.
    pub embedding_dim: usize,

    /// Metric the collection is created with. Default: cosine.
    pub distance_metric: DistanceMetric,

    /// Minimum similarity for a cache hit. Default: `0.8`.
    pub similarity_threshold: f32,

    /// Image embedding endpoint.
    pub embedding_url: String,

    /// Model name sent with embedding requests.
    pub embedding_model: String,

    /// Image classification endpoint.
    pub classifier_url: String,

    /// Bearer token for the embedding and classification endpoints.
    pub api_key: Option<String>,

    /// TCP connect timeout for remote calls. Default: 5s.
    pub connect_timeout: Duration,

    /// Whole-request timeout for remote calls. Default: 10s.
    pub request_timeout: Duration,
}

/// Default Qdrant URL used when `PHYTO_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Default Chroma URL used when `PHYTO_CHROMA_URL` is not set.
pub const DEFAULT_CHROMA_URL: &str = "http://localhost:8000";

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:5000/api/image-embedding";
pub const DEFAULT_CLASSIFIER_URL: &str = "http://localhost:5000/api/plant-recognition";
pub const DEFAULT_EMBEDDING_MODEL: &str = "image-embedding-model";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            storage_path: PathBuf::from("./uploads"),
            database_path: PathBuf::from("./.data/phyto.db"),
            vector_backend: VectorBackendKind::Qdrant,
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            chroma_url: DEFAULT_CHROMA_URL.to_string(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            distance_metric: DistanceMetric::Cosine,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            embedding_url: DEFAULT_EMBEDDING_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            classifier_url: DEFAULT_CLASSIFIER_URL.to_string(),
            api_key: None,
            connect_timeout: Duration::from_millis(5_000),
            request_timeout: Duration::from_millis(10_000),
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "PHYTO_PORT";
    const ENV_BIND_ADDR: &'static str = "PHYTO_BIND_ADDR";
    const ENV_STORAGE_PATH: &'static str = "PHYTO_STORAGE_PATH";
    const ENV_DATABASE_PATH: &'static str = "PHYTO_DATABASE_PATH";
    const ENV_VECTOR_BACKEND: &'static str = "PHYTO_VECTOR_BACKEND";
    const ENV_QDRANT_URL: &'static str = "PHYTO_QDRANT_URL";
    const ENV_CHROMA_URL: &'static str = "PHYTO_CHROMA_URL";
    const ENV_COLLECTION: &'static str = "PHYTO_COLLECTION";
    const ENV_EMBEDDING_DIM: &'static str = "PHYTO_EMBEDDING_DIM";
    const ENV_DISTANCE_METRIC: &'static str = "PHYTO_DISTANCE_METRIC";
    const ENV_SIMILARITY_THRESHOLD: &'static str = "PHYTO_SIMILARITY_THRESHOLD";
    const ENV_EMBEDDING_URL: &'static str = "PHYTO_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "PHYTO_EMBEDDING_MODEL";
    const ENV_CLASSIFIER_URL: &'static str = "PHYTO_CLASSIFIER_URL";
    const ENV_API_KEY: &'static str = "PHYTO_API_KEY";
    const ENV_CONNECT_TIMEOUT_MS: &'static str = "PHYTO_CONNECT_TIMEOUT_MS";
    const ENV_REQUEST_TIMEOUT_MS: &'static str = "PHYTO_REQUEST_TIMEOUT_MS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let storage_path = Self::parse_path_from_env(Self::ENV_STORAGE_PATH, defaults.storage_path);
        let database_path =
            Self::parse_path_from_env(Self::ENV_DATABASE_PATH, defaults.database_path);
        let vector_backend = match Self::parse_optional_string_from_env(Self::ENV_VECTOR_BACKEND) {
            Some(value) => value.parse()?,
            None => defaults.vector_backend,
        };
        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);
        let chroma_url = Self::parse_string_from_env(Self::ENV_CHROMA_URL, defaults.chroma_url);
        let collection_name =
            Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection_name);
        let embedding_dim = Self::parse_dimension_from_env(defaults.embedding_dim)?;
        let distance_metric = match Self::parse_optional_string_from_env(Self::ENV_DISTANCE_METRIC)
        {
            Some(value) => DistanceMetric::from_name(&value)
                .ok_or(ConfigError::UnknownMetric { value })?,
            None => defaults.distance_metric,
        };
        let similarity_threshold = Self::parse_threshold_from_env(defaults.similarity_threshold)?;
        let embedding_url =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_URL, defaults.embedding_url);
        let embedding_model =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_MODEL, defaults.embedding_model);
        let classifier_url =
            Self::parse_string_from_env(Self::ENV_CLASSIFIER_URL, defaults.classifier_url);
        let api_key = Self::parse_optional_string_from_env(Self::ENV_API_KEY);
        let connect_timeout =
            Self::parse_millis_from_env(Self::ENV_CONNECT_TIMEOUT_MS, defaults.connect_timeout);
        let request_timeout =
            Self::parse_millis_from_env(Self::ENV_REQUEST_TIMEOUT_MS, defaults.request_timeout);

        Ok(Self {
            port,
            bind_addr,
            storage_path,
            database_path,
            vector_backend,
            qdrant_url,
            chroma_url,
            collection_name,
            embedding_dim,
            distance_metric,
            similarity_threshold,
            embedding_url,
            embedding_model,
            classifier_url,
            api_key,
            connect_timeout,
            request_timeout,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.exists() && !self.storage_path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.storage_path.clone(),
            });
        }

        if self.database_path.is_dir() {
            return Err(ConfigError::NotAFile {
                path: self.database_path.clone(),
            });
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::InvalidThreshold {
                value: self.similarity_threshold.to_string(),
            });
        }

        if self.embedding_dim == 0 {
            return Err(ConfigError::InvalidDimension {
                value: self.embedding_dim.to_string(),
            });
        }

        if self.embedding_url.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint { name: "embedding" });
        }
        if self.classifier_url.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint { name: "classifier" });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// URL of the configured vector backend.
    pub fn vector_store_url(&self) -> &str {
        match self.vector_backend {
            VectorBackendKind::Qdrant => &self.qdrant_url,
            VectorBackendKind::Chroma => &self.chroma_url,
            VectorBackendKind::Mock => "mock:",
        }
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_threshold_from_env(default: f32) -> Result<f32, ConfigError> {
        match env::var(Self::ENV_SIMILARITY_THRESHOLD) {
            Ok(value) => match value.trim().parse::<f32>() {
                Ok(t) if (0.0..=1.0).contains(&t) => Ok(t),
                _ => Err(ConfigError::InvalidThreshold { value }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_dimension_from_env(default: usize) -> Result<usize, ConfigError> {
        match env::var(Self::ENV_EMBEDDING_DIM) {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(dim) if dim > 0 => Ok(dim),
                _ => Err(ConfigError::InvalidDimension { value }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_millis_from_env(var_name: &str, default: Duration) -> Duration {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|ms: &u64| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(default)
    }
}
