// libs/negotiation-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use shared_config::AppConfig;
use shared_utils::auth_middleware;

use crate::handlers::{
    create_appointment_handler, get_appointment_handler, list_appointments_handler,
    submit_transition_handler,
};

/// Appointment negotiation routes. Every route requires a valid bearer
/// token; party-level checks happen inside the handlers once the
/// appointment is loaded.
pub fn negotiation_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route(
            "/",
            post(create_appointment_handler).get(list_appointments_handler),
        )
        .route("/{appointment_id}", get(get_appointment_handler))
        .route(
            "/{appointment_id}/transitions",
            post(submit_transition_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
