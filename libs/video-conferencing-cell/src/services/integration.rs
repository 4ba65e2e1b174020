// libs/video-conferencing-cell/src/services/integration.rs
//! Join orchestration: eligibility gate, then a fresh token, then the session.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use appointment_cell::models::Appointment;
use appointment_cell::services::{can_join_appointment, Clock, SystemClock};
use shared_backend::BackendError;

use crate::models::{JoinError, VideoCredentials};
use crate::services::session::VideoSessionController;
use crate::services::token::VideoTokenProvider;

pub struct VideoCallService {
    tokens: Arc<dyn VideoTokenProvider>,
    clock: Arc<dyn Clock>,
}

impl VideoCallService {
    pub fn new(tokens: Arc<dyn VideoTokenProvider>) -> Self {
        Self::with_clock(tokens, Arc::new(SystemClock))
    }

    pub fn with_clock(tokens: Arc<dyn VideoTokenProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { tokens, clock }
    }

    /// Gate check followed by a token fetch. No token is requested for an
    /// appointment that cannot be joined right now.
    #[instrument(skip(self, appointment), fields(appointment_id = appointment.id))]
    pub async fn credentials_for(&self, appointment: &Appointment) -> Result<VideoCredentials, JoinError> {
        let eligibility = can_join_appointment(appointment, self.clock.now());
        if let Some(reason) = eligibility.reason {
            info!("Appointment {} not joinable: {}", appointment.id, reason);
            return Err(JoinError::NotEligible(reason));
        }

        self.tokens
            .fetch_credentials(appointment.id)
            .await
            .map_err(|err| {
                warn!("Video token fetch for {} failed: {}", appointment.id, err);
                // show the server's message rather than the transport wrapper
                let message = match err.downcast_ref::<BackendError>() {
                    Some(backend) => backend.message.clone(),
                    None => err.to_string(),
                };
                JoinError::TokenFetch(message)
            })
    }

    /// Full join: gate, token, then `controller.join`.
    pub async fn join(
        &self,
        appointment: &Appointment,
        controller: &VideoSessionController,
    ) -> Result<VideoCredentials, JoinError> {
        let credentials = self.credentials_for(appointment).await?;
        controller.join(&credentials).await?;
        Ok(credentials)
    }
}
