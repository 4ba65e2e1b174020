// libs/video-conferencing-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn video_conferencing_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(video_health_check));

    let protected_routes = Router::new()
        .route("/appointments/{appointment_id}/credentials", get(get_join_credentials))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
