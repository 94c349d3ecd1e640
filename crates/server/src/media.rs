//! Public serving of stored media.
//!
//! Exposes the media store root under /storage. No auth: everything in
//! the public area is reachable by anyone holding its path.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
};
use bytes::Bytes;
use tracing::{error, info};

use crate::config::AppState;

/// GET /storage/{*path}
pub async fn serve_media(
    Path(path): Path<String>,
    State(state): State<AppState>,
) -> std::result::Result<(HeaderMap, Bytes), StatusCode> {
    info!("GET /storage/{}", path);

    let data = state
        .media
        .read(&path)
        .await
        .map_err(|e| match e {
            media_store::Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            _ => {
                error!("Failed to read media {}: {}", path, e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&path)),
    );

    Ok((headers, data))
}

/// Infer a content type from the artifact extension
fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}
