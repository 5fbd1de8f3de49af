use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::error::GatewayError;
use super::state::HandlerState;
use super::{PHYTO_STATUS_HEADER, PHYTO_UPLOAD_HEADER, UPLOAD_URL_PREFIX};
use crate::classifier::ClassifierClient;
use crate::embedding::EmbeddingClient;
use crate::recognition::{Recognition, Resolution};
use crate::records::{Record, RecordStore};
use crate::vectordb::VectorStore;

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub limit: Option<u32>,
}

/// `POST /api/recognitions`: raw image bytes in, recognition out.
#[instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn recognize_handler<E, C, V, R>(
    State(state): State<HandlerState<E, C, V, R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError>
where
    E: EmbeddingClient + 'static,
    C: ClassifierClient + 'static,
    V: VectorStore + 'static,
    R: RecordStore + 'static,
{
    if body.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "request body must contain image bytes".to_string(),
        ));
    }

    let extension = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(extension_for_content_type)
        .unwrap_or_default();
    let file_name = format!("{}{extension}", Uuid::new_v4());
    let image_ref = format!("{UPLOAD_URL_PREFIX}{file_name}");

    let recognition = state.recognizer.recognize(&body, Some(&image_ref)).await;

    let mut upload_failed = false;
    if recognition.record.image_ref.as_deref() == Some(image_ref.as_str())
        && let Err(e) = store_upload(&state.storage_path, &file_name, &body).await
    {
        warn!(
            error = %e,
            image_ref = %image_ref,
            record_id = ?recognition.record.id,
            "Upload not stored; returning the recognition without it"
        );
        upload_failed = true;
    }

    info!(
        label = %recognition.record.label,
        status = resolution_status(&recognition.resolution),
        "Recognition complete"
    );

    let mut response = recognition_response(recognition);
    if upload_failed {
        response
            .headers_mut()
            .insert(PHYTO_UPLOAD_HEADER, HeaderValue::from_static("failed"));
    }
    Ok(response)
}

/// `GET /api/recognitions?limit=N`: newest records first.
#[instrument(skip(state))]
pub async fn recent_handler<E, C, V, R>(
    State(state): State<HandlerState<E, C, V, R>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<Record>>, GatewayError>
where
    E: EmbeddingClient + 'static,
    C: ClassifierClient + 'static,
    V: VectorStore + 'static,
    R: RecordStore + 'static,
{
    let records = state.recognizer.recent(params.limit).await?;
    Ok(Json(records))
}

/// `GET /api/recognitions/{id}`.
#[instrument(skip(state))]
pub async fn get_record_handler<E, C, V, R>(
    State(state): State<HandlerState<E, C, V, R>>,
    Path(id): Path<i64>,
) -> Result<Json<Record>, GatewayError>
where
    E: EmbeddingClient + 'static,
    C: ClassifierClient + 'static,
    V: VectorStore + 'static,
    R: RecordStore + 'static,
{
    state
        .recognizer
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("record {id}")))
}

pub(crate) fn resolution_status(resolution: &Resolution) -> &'static str {
    match resolution {
        Resolution::CacheHit { .. } => "hit",
        Resolution::Classified { .. } => "classified",
        Resolution::Failed => "failed",
    }
}

pub(crate) fn recognition_response(recognition: Recognition) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        PHYTO_STATUS_HEADER,
        HeaderValue::from_static(resolution_status(&recognition.resolution)),
    );
    (StatusCode::OK, headers, Json(recognition)).into_response()
}

pub(crate) fn extension_for_content_type(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        _ => "",
    }
}

async fn store_upload(
    dir: &std::path::Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<(), GatewayError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| GatewayError::StorageError(format!("{}: {e}", dir.display())))?;

    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| GatewayError::StorageError(format!("{}: {e}", path.display())))?;

    Ok(())
}
