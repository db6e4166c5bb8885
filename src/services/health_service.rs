use crate::dto::health::HealthResponse;

/// Respond with a static health payload; the process is healthy while it serves.
pub async fn health_status() -> HealthResponse {
    HealthResponse::ok()
}
