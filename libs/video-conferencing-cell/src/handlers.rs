// libs/video-conferencing-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::debug;

use appointment_cell::services::{AppointmentApi, HttpAppointmentApi};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{JoinError, VideoCredentials};
use crate::services::{HttpVideoTokenClient, VideoCallService};

impl From<JoinError> for AppError {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::NotEligible(reason) => {
                AppError::Conflict(format!("Video call not available: {}", reason))
            }
            JoinError::TokenFetch(message) => AppError::ExternalService(message),
            JoinError::Session(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Gate-checked credentials for joining the appointment's call. A fresh token
/// is issued on every request.
#[axum::debug_handler]
pub async fn get_join_credentials(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<VideoCredentials>, AppError> {
    let token = auth.token().to_string();
    debug!("User {} requested video credentials for {}", user.id, appointment_id);

    let appointments = HttpAppointmentApi::new(&state, Some(token.clone()));
    let appointment = appointments.get_appointment(appointment_id).await?;

    let service = VideoCallService::new(Arc::new(HttpVideoTokenClient::new(&state, Some(token))));
    let credentials = service.credentials_for(&appointment).await?;

    Ok(Json(credentials))
}

#[axum::debug_handler]
pub async fn video_health_check(
    State(state): State<Arc<AppConfig>>,
) -> Json<Value> {
    let configured = state.is_configured();

    Json(json!({
        "status": if configured { "healthy" } else { "not_configured" },
        "backend_configured": configured,
    }))
}
