use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use dicomtree_core::ScanError;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Scan(ScanError::InvalidConfig { .. }) => StatusCode::BAD_REQUEST,
            Self::Scan(_) | Self::Internal(_) => {
                error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
