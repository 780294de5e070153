/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{ErrorResponse, IngestError, IngestResult},
};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let upload_routes = ctx.config.service.upload_routes.clone();
    let max_body_bytes = ctx.config.service.max_body_bytes;
    let request_timeout = Duration::from_secs(ctx.config.service.request_timeout_secs);

    // Browser clients upload straight from the page
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(crate::api::routes(&upload_routes))
        .fallback(not_found)
        // Base64 inflates payloads by a third, so the body limit sits above the image limit
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(timeout_as_json))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            success: false,
            error: "Not found".to_string(),
            message: None,
        }),
    )
}

/// Give the timeout layer's empty 408 the usual failure body
async fn timeout_as_json(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if response.status() == StatusCode::REQUEST_TIMEOUT
        && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        return IngestError::Timeout.into_response();
    }

    response
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> IngestResult<()> {
    let addr = ctx.config.bind_address();

    info!("🚀 Image ingest server listening on {}", addr);
    info!("   Blob backend: {}", ctx.ingest.backend().name());
    for route in &ctx.config.service.upload_routes {
        info!("📤 Upload endpoint: POST {}{}", ctx.service_url(), route);
    }
    info!(
        "📋 Expected request body: {{ \"image\": \"data:image/png;base64,iVBORw0KGgo...\", \"filename\": \"optional-name\" }}"
    );

    let app = build_router(ctx);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IngestError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| IngestError::Internal(format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
