/// Base64 image upload endpoint
use crate::{
    context::AppContext,
    error::{IngestError, IngestResult},
    ingest::{UploadRequest, UploadResponse},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};

/// Build upload routes, one per configured path
pub fn routes(paths: &[String]) -> Router<AppContext> {
    paths
        .iter()
        .fold(Router::new(), |router, path| router.route(path, post(upload_image)))
}

/// Upload a base64 image
///
/// Body: `{ "image": "data:image/png;base64,...", "filename": "optional-name" }`
pub async fn upload_image(
    State(ctx): State<AppContext>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> IngestResult<Json<UploadResponse>> {
    let Json(request) = body.map_err(|rejection| IngestError::MalformedBody {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    let stored = ctx.ingest.ingest(request).await?;

    Ok(Json(UploadResponse::from(stored)))
}
