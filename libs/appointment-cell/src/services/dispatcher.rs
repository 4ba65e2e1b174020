// libs/appointment-cell/src/services/dispatcher.rs
//! Appointment action dispatcher.
//!
//! Every action goes to the backend first. Nothing local changes until the
//! server confirms; on success the cached appointment queries are invalidated
//! and a success notification is raised, on failure the server's message is
//! surfaced and the cache is left alone. Nothing is retried.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::models::{Appointment, AppointmentAction, AppointmentError, DisputeResolution};
use crate::services::api::AppointmentApi;
use crate::services::cache::{QueryCache, QueryKey};
use crate::services::notification::{
    Localizer, MessageKey, Notification, NotificationLevel, Notifier,
};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Rejected before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{action} is already in progress for appointment {appointment_id}")]
    InFlight {
        appointment_id: i64,
        action: AppointmentAction,
    },

    #[error(transparent)]
    Api(#[from] AppointmentError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub appointment: Appointment,
    pub available_actions: Vec<AppointmentAction>,
    pub message: String,
}

type InFlightKey = (i64, AppointmentAction);

/// Set of (appointment, action) pairs with a request outstanding. Clones share
/// the same set, so dispatchers built per request can still refuse duplicates.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry(Arc<Mutex<HashSet<InFlightKey>>>);

/// Removes its key from the in-flight set when the request settles,
/// including when the request future is dropped mid-way.
struct InFlightGuard {
    registry: InFlightRegistry,
    key: InFlightKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.registry.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.key);
    }
}

/// Acts on behalf of one viewer: reads are cached under that viewer and
/// notifications are addressed to them.
pub struct ActionDispatcher {
    viewer: String,
    api: Arc<dyn AppointmentApi>,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    localizer: Arc<dyn Localizer>,
    in_flight: InFlightRegistry,
}

impl ActionDispatcher {
    pub fn new(
        viewer: impl Into<String>,
        api: Arc<dyn AppointmentApi>,
        cache: Arc<QueryCache>,
        notifier: Arc<dyn Notifier>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            viewer: viewer.into(),
            api,
            cache,
            notifier,
            localizer,
            in_flight: InFlightRegistry::default(),
        }
    }

    pub fn with_in_flight(mut self, registry: InFlightRegistry) -> Self {
        self.in_flight = registry;
        self
    }

    /// Whether the control for this action should currently be disabled.
    pub fn is_in_flight(&self, appointment_id: i64, action: AppointmentAction) -> bool {
        let set = self.in_flight.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        set.contains(&(appointment_id, action))
    }

    pub async fn approve(&self, appointment_id: i64) -> Result<DispatchOutcome, DispatchError> {
        self.run(appointment_id, AppointmentAction::Approve, || self.api.approve(appointment_id))
            .await
    }

    pub async fn reject(&self, appointment_id: i64, reason: &str) -> Result<DispatchOutcome, DispatchError> {
        let reason = reason.trim();
        if reason.is_empty() {
            debug!("Reject for {} refused: blank reason", appointment_id);
            return Err(DispatchError::Validation("A rejection reason is required".to_string()));
        }

        self.run(
            appointment_id,
            AppointmentAction::Reject,
            || self.api.reject(appointment_id, reason.to_string()),
        )
        .await
    }

    pub async fn assign_doctor(
        &self,
        appointment_id: i64,
        doctor_id: i64,
    ) -> Result<DispatchOutcome, DispatchError> {
        if doctor_id <= 0 {
            return Err(DispatchError::Validation(format!("Invalid doctor id: {}", doctor_id)));
        }

        self.run(
            appointment_id,
            AppointmentAction::AssignDoctor,
            || self.api.assign_doctor(appointment_id, doctor_id),
        )
        .await
    }

    pub async fn complete(
        &self,
        appointment_id: i64,
        notes: Option<String>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let notes = notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());

        self.run(appointment_id, AppointmentAction::Complete, || self.api.complete(appointment_id, notes))
            .await
    }

    pub async fn cancel(&self, appointment_id: i64) -> Result<DispatchOutcome, DispatchError> {
        self.run(appointment_id, AppointmentAction::Cancel, || self.api.cancel(appointment_id))
            .await
    }

    pub async fn confirm_completion(&self, appointment_id: i64) -> Result<DispatchOutcome, DispatchError> {
        self.run(
            appointment_id,
            AppointmentAction::ConfirmCompletion,
            || self.api.confirm_completion(appointment_id),
        )
        .await
    }

    pub async fn resolve_dispute(
        &self,
        appointment_id: i64,
        resolution: DisputeResolution,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.run(
            appointment_id,
            AppointmentAction::ResolveDispute,
            || self.api.resolve_dispute(appointment_id, resolution),
        )
        .await
    }

    /// Read-through list query.
    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, AppointmentError> {
        if let Some(cached) = self.cache.get::<Vec<Appointment>>(&self.viewer, QueryKey::AppointmentList).await {
            debug!("Serving appointment list from cache");
            return Ok(cached);
        }

        let appointments = self.api.list_appointments().await?;
        self.cache.put(&self.viewer, QueryKey::AppointmentList, &appointments).await;
        Ok(appointments)
    }

    /// Read-through single-appointment query.
    pub async fn get_appointment(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        let key = QueryKey::Appointment(appointment_id);
        if let Some(cached) = self.cache.get::<Appointment>(&self.viewer, key).await {
            return Ok(cached);
        }

        let appointment = self.api.get_appointment(appointment_id).await?;
        self.cache.put(&self.viewer, key, &appointment).await;
        Ok(appointment)
    }

    #[instrument(skip(self, request))]
    async fn run<R, F>(
        &self,
        appointment_id: i64,
        action: AppointmentAction,
        request: R,
    ) -> Result<DispatchOutcome, DispatchError>
    where
        R: FnOnce() -> F,
        F: Future<Output = Result<Appointment, AppointmentError>>,
    {
        let _guard = self.begin(appointment_id, action)?;

        match request().await {
            Ok(appointment) => {
                self.cache.invalidate_appointment(appointment_id).await;

                let message = self.localizer.message(MessageKey::ActionSucceeded(action), None);
                self.notifier.notify(Notification {
                    viewer: self.viewer.clone(),
                    level: NotificationLevel::Success,
                    action,
                    appointment_id,
                    message: message.clone(),
                });

                info!("{} succeeded for appointment {} (now {})", action, appointment_id, appointment.status);

                Ok(DispatchOutcome {
                    available_actions: appointment.available_actions(),
                    appointment,
                    message,
                })
            }
            Err(err) => {
                warn!("{} failed for appointment {}: {}", action, appointment_id, err);

                let message = self
                    .localizer
                    .message(MessageKey::ActionFailed(action), Some(&err.user_message()));
                self.notifier.notify(Notification {
                    viewer: self.viewer.clone(),
                    level: NotificationLevel::Failure,
                    action,
                    appointment_id,
                    message,
                });

                Err(DispatchError::Api(err))
            }
        }
    }

    fn begin(&self, appointment_id: i64, action: AppointmentAction) -> Result<InFlightGuard, DispatchError> {
        let key = (appointment_id, action);
        let mut set = self.in_flight.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if !set.insert(key) {
            debug!("{} for {} refused: already in flight", action, appointment_id);
            return Err(DispatchError::InFlight { appointment_id, action });
        }

        Ok(InFlightGuard {
            registry: self.in_flight.clone(),
            key,
        })
    }
}
