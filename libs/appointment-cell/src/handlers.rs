// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use futures::stream::{self, Stream};
use headers::{Authorization, authorization::Bearer};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentView, AssignDoctorRequest, CompleteAppointmentRequest,
    RejectAppointmentRequest, ResolveDisputeRequest,
};
use crate::services::{
    can_join_appointment, ActionDispatcher, BroadcastNotifier, DispatchError, DispatchOutcome,
    EnglishMessages, HttpAppointmentApi, InFlightRegistry, JoinEligibility, QueryCache,
};

/// Shared state of the appointment routes.
#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<QueryCache>,
    pub notifier: Arc<BroadcastNotifier>,
    pub in_flight: InFlightRegistry,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let cache = Arc::new(QueryCache::new(config.query_stale_time()));
        Self {
            config,
            cache,
            notifier: Arc::new(BroadcastNotifier::default()),
            in_flight: InFlightRegistry::default(),
        }
    }

    /// Dispatcher acting as the caller, with the caller's own backend credentials.
    fn dispatcher(&self, user: &User, token: &str) -> ActionDispatcher {
        let api = HttpAppointmentApi::new(&self.config, Some(token.to_string()));
        ActionDispatcher::new(
            user.id.clone(),
            Arc::new(api),
            self.cache.clone(),
            self.notifier.clone(),
            Arc::new(EnglishMessages),
        )
        .with_in_flight(self.in_flight.clone())
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Validation(msg) => AppError::ValidationError(msg),
            DispatchError::InFlight { .. } => AppError::Conflict(err.to_string()),
            DispatchError::Api(api) => api.into(),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::Backend { status, message } => AppError::Upstream { status, message },
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Transport(msg) => AppError::ExternalService(msg),
            other @ (AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::DoctorNotAssigned(_)) => AppError::Conflict(other.to_string()),
        }
    }
}

fn ensure_can_manage(user: &User) -> Result<(), AppError> {
    if user.can_manage_appointments() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only admins and doctors can act on appointments".to_string()))
    }
}

// ==============================================================================
// QUERY HANDLERS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<AppointmentView>>, AppError> {
    let appointments = state.dispatcher(&user, auth.token()).list_appointments().await?;
    Ok(Json(appointments.into_iter().map(AppointmentView::from).collect()))
}

pub async fn get_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<AppointmentView>, AppError> {
    let appointment = state.dispatcher(&user, auth.token()).get_appointment(appointment_id).await?;
    Ok(Json(appointment.into()))
}

/// Gate result at request time; the console polls this for its countdown.
pub async fn join_eligibility(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<JoinEligibility>, AppError> {
    let appointment = state.dispatcher(&user, auth.token()).get_appointment(appointment_id).await?;
    let eligibility = can_join_appointment(&appointment, Utc::now());
    debug!("Join eligibility for {}: {:?}", appointment_id, eligibility);
    Ok(Json(eligibility))
}

/// Server-sent stream of the caller's own action notifications.
pub async fn notification_stream(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    info!("Operator {} subscribed to notifications", user.id);
    let receiver = state.notifier.subscribe();

    let events = stream::unfold((receiver, user.id), |(mut receiver, viewer)| async move {
        loop {
            match receiver.recv().await {
                Ok(notification) if notification.viewer == viewer => {
                    let event = Event::default().event("notification").json_data(&notification);
                    return Some((event, (receiver, viewer)));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Notification stream for {} lagged, {} skipped", viewer, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

// ==============================================================================
// ACTION HANDLERS
// ==============================================================================

pub async fn approve_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<DispatchOutcome>, AppError> {
    ensure_can_manage(&user)?;
    let outcome = state.dispatcher(&user, auth.token()).approve(appointment_id).await?;
    Ok(Json(outcome))
}

pub async fn reject_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<RejectAppointmentRequest>,
) -> Result<Json<DispatchOutcome>, AppError> {
    ensure_can_manage(&user)?;
    let outcome = state.dispatcher(&user, auth.token()).reject(appointment_id, &request.reason).await?;
    Ok(Json(outcome))
}

pub async fn assign_doctor(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<AssignDoctorRequest>,
) -> Result<Json<DispatchOutcome>, AppError> {
    ensure_can_manage(&user)?;
    let outcome = state
        .dispatcher(&user, auth.token())
        .assign_doctor(appointment_id, request.doctor_id)
        .await?;
    Ok(Json(outcome))
}

pub async fn complete_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<DispatchOutcome>, AppError> {
    ensure_can_manage(&user)?;
    let outcome = state.dispatcher(&user, auth.token()).complete(appointment_id, request.notes).await?;
    Ok(Json(outcome))
}

pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<DispatchOutcome>, AppError> {
    ensure_can_manage(&user)?;
    let outcome = state.dispatcher(&user, auth.token()).cancel(appointment_id).await?;
    Ok(Json(outcome))
}

pub async fn confirm_completion(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<DispatchOutcome>, AppError> {
    ensure_can_manage(&user)?;
    let outcome = state.dispatcher(&user, auth.token()).confirm_completion(appointment_id).await?;
    Ok(Json(outcome))
}

pub async fn resolve_dispute(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<ResolveDisputeRequest>,
) -> Result<Json<DispatchOutcome>, AppError> {
    ensure_can_manage(&user)?;
    let outcome = state
        .dispatcher(&user, auth.token())
        .resolve_dispute(appointment_id, request.resolution)
        .await?;
    Ok(Json(outcome))
}
