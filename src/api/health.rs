/// Liveness endpoint
use crate::context::AppContext;
use axum::{response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health_check))
}

/// Static liveness check, independent of blob storage state
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "Server is running!".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_status() {
        let Json(health) = health_check().await;
        assert_eq!(health.status, "Server is running!");
        assert_eq!(
            serde_json::to_value(&health).unwrap(),
            serde_json::json!({ "status": "Server is running!" })
        );
    }
}
