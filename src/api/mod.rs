/// API routes and handlers
pub mod blob;
pub mod health;
pub mod upload;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes(upload_paths: &[String]) -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(upload::routes(upload_paths))
        .merge(blob::routes())
}
