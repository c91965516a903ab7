//! # md-api
//!
//! The HTTP routing layer for the drone fleet.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod payload;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use md_core::traits::MediaStore;
use md_core::FleetService;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub fleet: Arc<FleetService>,
    pub media: Arc<dyn MediaStore>,
}

/// Builds the `/api/drones` routes with tracing, request ids and CORS.
///
/// Media files are not served here; the binary mounts them next to this
/// router so the directory can live anywhere.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/drones/register/", post(handlers::register_drone))
        .route("/api/drones/available/", get(handlers::list_available))
        .route("/api/drones/{id}/battery/", get(handlers::get_battery))
        .route("/api/drones/{id}/medications/", get(handlers::list_medications))
        .route("/api/drones/{id}/load/", post(handlers::load_medications))
        .route("/api/drones/{id}/status/", patch(handlers::update_status))
        .with_state(state)
        .layer(middleware::cors_policy())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
