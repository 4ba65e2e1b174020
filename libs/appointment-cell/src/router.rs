// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    appointment_routes_with_state(AppointmentState::new(config))
}

pub fn appointment_routes_with_state(state: AppointmentState) -> Router {
    // All appointment operations require authentication
    Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/notifications", get(handlers::notification_stream))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/join-eligibility", get(handlers::join_eligibility))
        .route("/{appointment_id}/approve", post(handlers::approve_appointment))
        .route("/{appointment_id}/reject", post(handlers::reject_appointment))
        .route("/{appointment_id}/assign-doctor", post(handlers::assign_doctor))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/confirm-completion", post(handlers::confirm_completion))
        .route("/{appointment_id}/resolve-dispute", post(handlers::resolve_dispute))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
