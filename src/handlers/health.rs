//! Liveness endpoint for monitoring and orchestration.

use actix_web::{HttpResponse, Responder};

/// `GET /api/v1/health`
///
/// ```json
/// { "status": "ok" }
/// ```
#[tracing::instrument]
pub async fn health_check() -> impl Responder {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}
