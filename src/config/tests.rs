use super::*;
use serial_test::serial;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_phyto_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        for key in [
            "PHYTO_PORT",
            "PHYTO_BIND_ADDR",
            "PHYTO_STORAGE_PATH",
            "PHYTO_DATABASE_PATH",
            "PHYTO_VECTOR_BACKEND",
            "PHYTO_QDRANT_URL",
            "PHYTO_CHROMA_URL",
            "PHYTO_COLLECTION",
            "PHYTO_EMBEDDING_DIM",
            "PHYTO_DISTANCE_METRIC",
            "PHYTO_SIMILARITY_THRESHOLD",
            "PHYTO_EMBEDDING_URL",
            "PHYTO_EMBEDDING_MODEL",
            "PHYTO_CLASSIFIER_URL",
            "PHYTO_API_KEY",
            "PHYTO_CONNECT_TIMEOUT_MS",
            "PHYTO_REQUEST_TIMEOUT_MS",
        ] {
            env::remove_var(key);
        }
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.port, 8080);
    assert_eq!(
        config.bind_addr,
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))
    );
    assert_eq!(config.storage_path, PathBuf::from("./uploads"));
    assert_eq!(config.vector_backend, VectorBackendKind::Qdrant);
    assert_eq!(config.qdrant_url, "http://localhost:6334");
    assert_eq!(config.embedding_dim, 512);
    assert!((config.similarity_threshold - 0.8).abs() < f32::EPSILON);
    assert!(config.api_key.is_none());
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.request_timeout, Duration::from_secs(10));
}

#[test]
fn test_socket_addr() {
    let config = Config::default();
    assert_eq!(config.socket_addr(), "127.0.0.1:8080");

    let config = Config {
        port: 3000,
        bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        ..Default::default()
    };
    assert_eq!(config.socket_addr(), "0.0.0.0:3000");
}

#[test]
fn test_vector_store_url_follows_backend() {
    let mut config = Config::default();
    assert_eq!(config.vector_store_url(), DEFAULT_QDRANT_URL);

    config.vector_backend = VectorBackendKind::Chroma;
    assert_eq!(config.vector_store_url(), DEFAULT_CHROMA_URL);

    config.vector_backend = VectorBackendKind::Mock;
    assert_eq!(config.vector_store_url(), "mock:");
}

#[test]
fn test_backend_kind_parse() {
    assert_eq!(
        "qdrant".parse::<VectorBackendKind>().unwrap(),
        VectorBackendKind::Qdrant
    );
    assert_eq!(
        " Chroma ".parse::<VectorBackendKind>().unwrap(),
        VectorBackendKind::Chroma
    );
    assert!(matches!(
        "milvus".parse::<VectorBackendKind>(),
        Err(ConfigError::UnknownBackend { .. })
    ));
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_phyto_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert_eq!(config.port, 8080);
    assert_eq!(config.vector_backend, VectorBackendKind::Qdrant);
    assert_eq!(config.collection_name, "plant_collection");
}

#[test]
#[serial]
fn test_from_env_custom_values() {
    clear_phyto_env();

    with_env_vars(
        &[
            ("PHYTO_PORT", "3000"),
            ("PHYTO_VECTOR_BACKEND", "chroma"),
            ("PHYTO_CHROMA_URL", "http://chroma:8000"),
            ("PHYTO_EMBEDDING_DIM", "1536"),
            ("PHYTO_SIMILARITY_THRESHOLD", "0.9"),
            ("PHYTO_API_KEY", "secret"),
            ("PHYTO_REQUEST_TIMEOUT_MS", "2500"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            assert_eq!(config.port, 3000);
            assert_eq!(config.vector_backend, VectorBackendKind::Chroma);
            assert_eq!(config.vector_store_url(), "http://chroma:8000");
            assert_eq!(config.embedding_dim, 1536);
            assert!((config.similarity_threshold - 0.9).abs() < f32::EPSILON);
            assert_eq!(config.api_key.as_deref(), Some("secret"));
            assert_eq!(config.request_timeout, Duration::from_millis(2500));
        },
    );
}

#[test]
#[serial]
fn test_from_env_invalid_port() {
    clear_phyto_env();

    with_env_vars(&[("PHYTO_PORT", "0")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidPort { .. })
        ));
    });

    with_env_vars(&[("PHYTO_PORT", "not-a-port")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::PortParseError { .. })
        ));
    });
}

#[test]
#[serial]
fn test_from_env_invalid_threshold() {
    clear_phyto_env();

    with_env_vars(&[("PHYTO_SIMILARITY_THRESHOLD", "1.5")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidThreshold { .. })
        ));
    });

    with_env_vars(&[("PHYTO_SIMILARITY_THRESHOLD", "high")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidThreshold { .. })
        ));
    });
}

#[test]
#[serial]
fn test_from_env_invalid_dimension() {
    clear_phyto_env();

    with_env_vars(&[("PHYTO_EMBEDDING_DIM", "0")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidDimension { .. })
        ));
    });
}

#[test]
#[serial]
fn test_from_env_unknown_backend() {
    clear_phyto_env();

    with_env_vars(&[("PHYTO_VECTOR_BACKEND", "pinecone")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::UnknownBackend { .. })
        ));
    });
}

#[test]
#[serial]
fn test_from_env_distance_metric() {
    clear_phyto_env();

    with_env_vars(&[("PHYTO_DISTANCE_METRIC", "L2")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(config.distance_metric, DistanceMetric::L2);
    });

    with_env_vars(&[("PHYTO_DISTANCE_METRIC", "manhattan")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::UnknownMetric { .. })
        ));
    });
}

#[test]
#[serial]
fn test_from_env_blank_api_key_is_none() {
    clear_phyto_env();

    with_env_vars(&[("PHYTO_API_KEY", "   ")], || {
        let config = Config::from_env().expect("should parse");
        assert!(config.api_key.is_none());
    });
}

#[test]
#[serial]
fn test_from_env_zero_timeout_falls_back() {
    clear_phyto_env();

    with_env_vars(&[("PHYTO_CONNECT_TIMEOUT_MS", "0")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    });
}

#[test]
fn test_validate_defaults_ok() {
    let config = Config {
        storage_path: PathBuf::from("/nonexistent/uploads"),
        database_path: PathBuf::from("/nonexistent/phyto.db"),
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_storage_path_is_file() {
    let temp = tempfile::NamedTempFile::new().expect("temp file");
    let config = Config {
        storage_path: temp.path().to_path_buf(),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotADirectory { .. })
    ));
}

#[test]
fn test_validate_database_path_is_dir() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    let config = Config {
        storage_path: temp.path().join("uploads"),
        database_path: temp.path().to_path_buf(),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotAFile { .. })
    ));
}

#[test]
fn test_validate_rejects_out_of_range_threshold() {
    let config = Config {
        storage_path: PathBuf::from("/nonexistent/uploads"),
        similarity_threshold: -0.1,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidThreshold { .. })
    ));
}

#[test]
fn test_validate_rejects_empty_endpoints() {
    let config = Config {
        storage_path: PathBuf::from("/nonexistent/uploads"),
        classifier_url: "  ".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingEndpoint { name: "classifier" })
    ));
}
