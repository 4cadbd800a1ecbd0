//! HTTP API request handlers

/// Liveness probe
pub async fn health_check() -> &'static str {
    "ok"
}
