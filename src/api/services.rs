use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, Limited};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::{
    models::{
        DownloadRequest, DownloadStartedResponse, ExtractResponse, FormatsResponse,
        HealthResponse, MessageResponse, TaskListResponse, TaskResponse, UrlRequest,
    },
    state::AppState,
    validation::{validate_download_request, validate_url_request},
};
use crate::api::error::ApiError;
use crate::humanize::ByteSize;
use crate::urls::Platform;

/// Metadata lookup (POST /api/extract)
///
/// Classifies the URL and asks the matching handler for title, duration,
/// thumbnail and formats. No task is created.
pub async fn extract_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: UrlRequest = read_json(&state, &headers, body).await?;
    validate_url_request(&request)?;

    let info = state.manager.extract_info(&request.url).await?;

    Ok(Json(ExtractResponse {
        success: true,
        info,
    }))
}

/// Start a download (POST /api/download)
///
/// Returns as soon as the task is queued; clients poll
/// `/api/status/{task_id}` for progress.
pub async fn start_download(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: DownloadRequest = read_json(&state, &headers, body).await?;
    validate_download_request(&request)?;

    let task_id = state
        .manager
        .submit(&request.url, request.format_id)
        .await?;

    Ok(Json(DownloadStartedResponse {
        success: true,
        task_id,
        message: "Download started".to_string(),
    }))
}

/// Task snapshot (GET /api/status/{task_id})
pub async fn task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.manager.get(&task_id).await?;
    Ok(Json(TaskResponse {
        success: true,
        task,
    }))
}

/// All known tasks, oldest first (GET /api/downloads)
pub async fn list_downloads(State(state): State<AppState>) -> impl IntoResponse {
    Json(TaskListResponse {
        success: true,
        tasks: state.manager.list().await,
    })
}

/// Cancel a task (POST /api/cancel/{task_id})
pub async fn cancel_download(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.manager.cancel(&task_id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Download cancelled".to_string(),
    }))
}

/// Available formats (POST /api/formats)
pub async fn list_formats(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: UrlRequest = read_json(&state, &headers, body).await?;
    validate_url_request(&request)?;

    let formats = state.manager.list_formats(&request.url).await?;
    Ok(Json(FormatsResponse {
        success: true,
        formats,
    }))
}

/// Stream a finished download as an attachment (GET /api/download/{task_id})
pub async fn download_file(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let (_, path) = state.manager.result_file(&task_id).await?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::NotFound(format!("file for task {task_id}: {e}")))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .len();

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', ""))
        .unwrap_or_else(|| format!("{task_id}.mp4"));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    info!(task_id = %task_id, size = %ByteSize(size), "Serving download");

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type_for(&filename));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok(response)
}

/// Health check endpoint (GET /health)
///
/// Returns 503 Service Unavailable if any component is unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();

    components.insert("api".to_string(), "healthy".to_string());
    let workers = if state.manager.pool().health_check() {
        "healthy"
    } else {
        "unhealthy"
    };
    components.insert("workers".to_string(), workers.to_string());
    // Unregistered platforms resolve to the generic handler
    let registry = state.manager.registry();
    let handlers = if registry.has_handler(Platform::Generic) {
        "healthy"
    } else {
        "unhealthy"
    };
    components.insert("handlers".to_string(), handlers.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let (overall_status, status_code) = if all_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        platforms: registry.platforms(),
        tasks: state.manager.store().counts_by_status().await,
        metrics: state.metrics.snapshot(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

/// Check Content-Type, enforce the size limit and parse the body
async fn read_json<T: DeserializeOwned>(
    state: &AppState,
    headers: &HeaderMap,
    body: Body,
) -> Result<T, ApiError> {
    super::utils::require_json(headers)?;

    // Limit applies to the decompressed stream, before it is buffered
    let limit = state.config.server.max_payload_bytes.as_usize();
    let data = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|err| super::utils::body_error(err, limit))?
        .to_bytes();

    Ok(serde_json::from_slice(&data)?)
}

fn content_type_for(filename: &str) -> HeaderValue {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    };
    HeaderValue::from_static(mime)
}
