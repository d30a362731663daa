//! HTTP router for the gateway binary

use axum::Router;
use fngate_runtime::{gateway_router, GatewayState};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the main application router
pub fn create_router(state: GatewayState) -> Router {
    gateway_router(Arc::new(state)).layer(TraceLayer::new_for_http())
}
