//! `GET /file/*path`: raw file retrieval for the viewer.

use std::fmt::Write as _;
use std::time::SystemTime;

use axum::body::Body;
use axum::extract::{Path, Query};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use dicomtree_core::normalize_path;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FileQuery {
    filename: Option<String>,
}

pub(crate) async fn serve_file(
    Path(raw): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let path = resolve_path(&raw);
    if path.is_empty() {
        return Err(ApiError::NotFound);
    }

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => {
            debug!(%path, "file not found");
            return Err(ApiError::NotFound);
        }
    };
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::NotFound)?;

    let name = query.filename.filter(|name| !name.is_empty());
    let pdf = name
        .as_deref()
        .is_some_and(|name| name.to_lowercase().ends_with(".pdf"));

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(if pdf {
            "application/pdf"
        } else {
            "application/octet-stream"
        }),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    if let Ok(modified) = metadata.modified() {
        headers.insert(LAST_MODIFIED, header_value(&http_date(modified))?);
    }
    if let Some(name) = name {
        headers.insert(
            CONTENT_DISPOSITION,
            header_value(&content_disposition(&name, pdf))?,
        );
    }

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Turn the wildcard capture back into a filesystem path.
///
/// The router strips the leading `/` of absolute paths, so it is put back
/// unless the path starts with a drive letter.
pub(crate) fn resolve_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.as_bytes().get(1) == Some(&b':') {
        normalize_path(trimmed)
    } else {
        normalize_path(format!("/{trimmed}"))
    }
}

/// RFC 7231 IMF-fixdate.
pub(crate) fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// `inline` for PDFs, `attachment` otherwise, with an RFC 5987 file name.
pub(crate) fn content_disposition(name: &str, inline: bool) -> String {
    let kind = if inline { "inline" } else { "attachment" };
    format!("{kind}; filename*=UTF-8''{}", encode_uri_component(name))
}

/// Percent-encode everything except the URI component unreserved set.
fn encode_uri_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            _ => {
                let _ = write!(encoded, "%{byte:02X}");
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("tmp/scan/a.dcm"), "/tmp/scan/a.dcm");
        assert_eq!(resolve_path("/tmp//scan/../a.dcm"), "/tmp/a.dcm");
        assert_eq!(resolve_path("C:/data/a.dcm"), "C:/data/a.dcm");
        assert_eq!(resolve_path("  "), "");
    }

    #[test]
    fn test_http_date() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("report.pdf", true),
            "inline; filename*=UTF-8''report.pdf"
        );
        assert_eq!(
            content_disposition("scan 1 (final).dcm", false),
            "attachment; filename*=UTF-8''scan%201%20(final).dcm"
        );
        assert_eq!(
            content_disposition("résumé.pdf", true),
            "inline; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }
}
