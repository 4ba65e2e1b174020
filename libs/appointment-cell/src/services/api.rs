// libs/appointment-cell/src/services/api.rs
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use shared_backend::BackendClient;
use shared_config::AppConfig;

use crate::models::{Appointment, AppointmentError, DisputeResolution};

/// Appointment endpoints of the clinic backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentApi: Send + Sync {
    async fn list_appointments(&self) -> Result<Vec<Appointment>, AppointmentError>;

    async fn get_appointment(&self, appointment_id: i64) -> Result<Appointment, AppointmentError>;

    async fn approve(&self, appointment_id: i64) -> Result<Appointment, AppointmentError>;

    async fn reject(&self, appointment_id: i64, reason: String) -> Result<Appointment, AppointmentError>;

    async fn assign_doctor(&self, appointment_id: i64, doctor_id: i64) -> Result<Appointment, AppointmentError>;

    async fn complete(&self, appointment_id: i64, notes: Option<String>) -> Result<Appointment, AppointmentError>;

    async fn cancel(&self, appointment_id: i64) -> Result<Appointment, AppointmentError>;

    async fn confirm_completion(&self, appointment_id: i64) -> Result<Appointment, AppointmentError>;

    async fn resolve_dispute(
        &self,
        appointment_id: i64,
        resolution: DisputeResolution,
    ) -> Result<Appointment, AppointmentError>;
}

/// REST implementation over [`BackendClient`], acting as one signed-in operator.
pub struct HttpAppointmentApi {
    client: BackendClient,
    access_token: Option<String>,
}

impl HttpAppointmentApi {
    pub fn new(config: &AppConfig, access_token: Option<String>) -> Self {
        Self::with_client(BackendClient::new(config), access_token)
    }

    pub fn with_client(client: BackendClient, access_token: Option<String>) -> Self {
        Self { client, access_token }
    }

    fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    async fn mutate(
        &self,
        appointment_id: i64,
        action_path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/api/v1/appointments/{}/{}", appointment_id, action_path);
        debug!("POST {}", path);

        let appointment = self.client.post(&path, self.token(), body).await?;
        Ok(appointment)
    }
}

#[async_trait]
impl AppointmentApi for HttpAppointmentApi {
    #[instrument(skip(self))]
    async fn list_appointments(&self) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.client.get("/api/v1/appointments", self.token()).await?;
        Ok(appointments)
    }

    #[instrument(skip(self))]
    async fn get_appointment(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        let path = format!("/api/v1/appointments/{}", appointment_id);
        let appointment = self.client.get(&path, self.token()).await?;
        Ok(appointment)
    }

    async fn approve(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        self.mutate(appointment_id, "approve", None).await
    }

    async fn reject(&self, appointment_id: i64, reason: String) -> Result<Appointment, AppointmentError> {
        self.mutate(appointment_id, "reject", Some(json!({ "reason": reason }))).await
    }

    async fn assign_doctor(&self, appointment_id: i64, doctor_id: i64) -> Result<Appointment, AppointmentError> {
        self.mutate(appointment_id, "assign-doctor", Some(json!({ "doctorId": doctor_id }))).await
    }

    async fn complete(&self, appointment_id: i64, notes: Option<String>) -> Result<Appointment, AppointmentError> {
        self.mutate(appointment_id, "complete", Some(json!({ "notes": notes }))).await
    }

    async fn cancel(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        self.mutate(appointment_id, "cancel", None).await
    }

    async fn confirm_completion(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        self.mutate(appointment_id, "confirm-completion", None).await
    }

    async fn resolve_dispute(
        &self,
        appointment_id: i64,
        resolution: DisputeResolution,
    ) -> Result<Appointment, AppointmentError> {
        self.mutate(appointment_id, "resolve-dispute", Some(json!({ "resolution": resolution }))).await
    }
}
