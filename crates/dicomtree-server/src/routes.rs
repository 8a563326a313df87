//! Router and JSON/stream handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::{Stream, StreamExt, future};
use serde::Deserialize;
use tracing::{info, warn};

use dicomtree_core::{DicomRecord, ScanConfig, ScanRequest};
use dicomtree_scan::{
    DicomScanner, DirectoryWalker, FRAME_CONTENT_TYPE, Listing, encode_frame, path_exists,
};

use crate::config::ServerConfig;
use crate::error::{ApiError, ServerError};
use crate::file::serve_file;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    scanner: Arc<DicomScanner>,
    walker: Arc<DirectoryWalker>,
    config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let walker = DirectoryWalker::with_threads(config.scan_threads)?;
        Ok(Self {
            scanner: Arc::new(DicomScanner::new()),
            walker: Arc::new(walker),
            config: Arc::new(config),
        })
    }

    /// Scanner whose progress updates cover every streamed scan.
    pub fn scanner(&self) -> &DicomScanner {
        &self.scanner
    }

    fn scan_config(&self, request: ScanRequest) -> ScanConfig {
        let mut config = ScanConfig::from(request);
        config.channel_capacity = self.config.channel_capacity;
        config.threads = self.config.scan_threads;
        config
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/parse", post(parse))
        .route("/api/dirs", post(list_dirs))
        .route("/api/exists", post(exists))
        .route("/file/*path", get(serve_file))
        .with_state(state)
}

/// POST /api/parse - stream one frame per DICOM image found under the roots.
///
/// The response body owns the scan; a client disconnect drops it and the
/// producer stops before its next file.
async fn parse(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Response, ApiError> {
    info!(roots = request.root_paths.len(), deep = request.deep, "scan requested");
    let records = state.scanner.scan(state.scan_config(request))?;

    Ok((
        [(CONTENT_TYPE, FRAME_CONTENT_TYPE), (CACHE_CONTROL, "no-cache")],
        Body::from_stream(frames(records)),
    )
        .into_response())
}

/// Encode each record as one frame. A record that cannot be encoded is
/// logged and left out; the rest of the stream carries on.
pub(crate) fn frames(
    records: impl Stream<Item = DicomRecord>,
) -> impl Stream<Item = Result<Vec<u8>, Infallible>> {
    records.filter_map(|record| {
        let frame = encode_frame(&record)
            .inspect_err(|e| warn!(path = %record.path, error = %e, "cannot encode record, skipped"))
            .ok()
            .map(Ok);
        future::ready(frame)
    })
}

#[derive(Debug, Deserialize)]
struct DirsRequest {
    #[serde(default)]
    paths: Vec<String>,
}

/// POST /api/dirs - one level of folders and files for each path.
async fn list_dirs(
    State(state): State<AppState>,
    Json(request): Json<DirsRequest>,
) -> Result<Json<Listing>, ApiError> {
    let walker = Arc::clone(&state.walker);
    let listing = tokio::task::spawn_blocking(move || walker.list(&request.paths))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(listing))
}

#[derive(Debug, Deserialize)]
struct ExistsRequest {
    path: String,
}

async fn exists(Json(request): Json<ExistsRequest>) -> Result<Json<bool>, ApiError> {
    let found = tokio::task::spawn_blocking(move || path_exists(&request.path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(found))
}
