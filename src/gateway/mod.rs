//! HTTP gateway (Axum) in front of the recognizer.
//!
//! This module is primarily used by the `phyto` server binary.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{get_record_handler, recent_handler, recognize_handler};
pub use state::HandlerState;

use crate::classifier::ClassifierClient;
use crate::embedding::EmbeddingClient;
use crate::records::RecordStore;
use crate::vectordb::VectorStore;

/// Response header carrying the outcome (`hit`, `classified`, `failed`, or an error kind).
pub const PHYTO_STATUS_HEADER: &str = "x-phyto-status";

/// Set to `failed` when the recognition succeeded but the uploaded image could not be written.
pub const PHYTO_UPLOAD_HEADER: &str = "x-phyto-upload";

/// URL prefix of image references handed out for uploads.
pub const UPLOAD_URL_PREFIX: &str = "/uploads/";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn create_router_with_state<E, C, V, R>(state: HandlerState<E, C, V, R>) -> Router
where
    E: EmbeddingClient + 'static,
    C: ClassifierClient + 'static,
    V: VectorStore + 'static,
    R: RecordStore + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route(
            "/api/recognitions",
            post(recognize_handler::<E, C, V, R>).get(recent_handler::<E, C, V, R>),
        )
        .route(
            "/api/recognitions/{id}",
            get(get_record_handler::<E, C, V, R>),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(PHYTO_STATUS_HEADER, HeaderValue::from_static("healthy"));

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}
