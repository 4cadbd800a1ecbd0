//! API route definitions

use crate::api::handlers;
use crate::app::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create the main API router
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().route("/healthz", get(handlers::health_check))
}
