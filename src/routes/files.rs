use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/images/file/:filename — stream the stored bytes with the content
/// type recorded at upload time, a one-year cache directive, and the
/// object's etag.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // The router only hands us a single path segment, but keep the key out
    // of dot-dot territory regardless.
    if filename.contains("..") || filename.contains('/') {
        return Err(ApiError::NotFound("File not found"));
    }

    let key = format!("images/{filename}");
    let object = state
        .store
        .get(&key)
        .await?
        .ok_or(ApiError::NotFound("File not found"))?;

    Ok((
        [
            (header::CONTENT_TYPE, object.content_type),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000".to_string(),
            ),
            (header::ETAG, format!("\"{}\"", object.etag)),
        ],
        Body::from(object.body),
    ))
}
