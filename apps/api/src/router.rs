use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use negotiation_cell::router::negotiation_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "BrightSmile Booking API is running!" }))
        .nest("/appointments", negotiation_routes(state.clone()))
}
