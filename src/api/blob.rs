/// Stored object read-back endpoint
///
/// Disk and memory backends have no public host of their own; their public
/// URLs point here.
use crate::{
    context::AppContext,
    error::{IngestError, IngestResult},
    ingest::STORED_CONTENT_TYPE,
};
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

/// Build blob routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/blob/*key", get(get_blob))
}

/// Get a stored object by key
async fn get_blob(
    State(ctx): State<AppContext>,
    Path(key): Path<String>,
) -> IngestResult<Response> {
    let data = ctx
        .ingest
        .backend()
        .get(&key)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("Blob not found: {}", key)))?;

    // Keys embed a timestamp and are never rewritten
    Ok((
        [
            (header::CONTENT_TYPE, STORED_CONTENT_TYPE),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        data,
    )
        .into_response())
}
