//! Phyto HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use phyto::classifier::HttpClassifierClient;
use phyto::config::Config;
use phyto::embedding::HttpEmbeddingClient;
use phyto::gateway::{HandlerState, create_router_with_state};
use phyto::recognition::{Recognizer, RecognizerConfig};
use phyto::records::SqliteRecordStore;
use phyto::remote::RemoteEndpoint;
use phyto::vectordb::VectorBackend;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check().await);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        backend = ?config.vector_backend,
        threshold = config.similarity_threshold,
        "Phyto starting"
    );

    tokio::fs::create_dir_all(&config.storage_path).await?;

    let records = SqliteRecordStore::open(&config.database_path).await?;
    let vectors = VectorBackend::from_config(&config).await?;
    tracing::info!(
        backend = vectors.name(),
        url = config.vector_store_url(),
        collection = %config.collection_name,
        "Vector store configured"
    );

    let embedder = HttpEmbeddingClient::new(
        RemoteEndpoint::embedding(&config),
        config.embedding_model.clone(),
        config.embedding_dim,
    );
    let classifier = HttpClassifierClient::new(RemoteEndpoint::classifier(&config));

    let recognizer = Arc::new(Recognizer::new(
        embedder,
        classifier,
        vectors,
        records.clone(),
        RecognizerConfig::from_config(&config),
    ));

    // Not fatal: searches degrade to misses until the store is reachable.
    recognizer.init().await;

    let state = HandlerState::new(Arc::clone(&recognizer), config.storage_path.clone());
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    records.close().await;
    tracing::info!("Phyto shutdown complete");
    Ok(())
}

async fn run_health_check() -> i32 {
    let port = std::env::var("PHYTO_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{port}/healthz");
    let client = phyto::remote::build_http_client(Duration::from_secs(1), Duration::from_secs(1));

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
