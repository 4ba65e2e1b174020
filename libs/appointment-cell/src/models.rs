// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: Option<i64>,
    pub start_date_time: DateTime<Utc>,
    pub duration_minutes: i64,
    #[serde(rename = "type")]
    pub modality: AppointmentModality,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,
}

/// End of a window of `duration_minutes` from `start`. `None` when the end
/// lies beyond the representable range, i.e. the window never ends.
pub fn window_end(start: DateTime<Utc>, duration_minutes: i64) -> Option<DateTime<Utc>> {
    Duration::try_minutes(duration_minutes).and_then(|duration| start.checked_add_signed(duration))
}

impl Appointment {
    /// Scheduled end of the consultation window.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        window_end(self.start_date_time, self.duration_minutes)
    }

    pub fn has_doctor(&self) -> bool {
        self.doctor_id.is_some()
    }

    pub fn available_actions(&self) -> Vec<AppointmentAction> {
        self.status.available_actions()
    }

    /// Mirror of the backend's transition rule, including the doctor
    /// assignment requirement for post-assignment states.
    pub fn validate_transition(&self, to: &AppointmentStatus) -> Result<(), AppointmentError> {
        self.status.validate_transition(to)?;

        if to.requires_doctor() && !self.has_doctor() {
            return Err(AppointmentError::DoctorNotAssigned(self.id));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentModality {
    #[serde(alias = "in_person", alias = "OFFLINE")]
    InPerson,
    #[serde(alias = "online", alias = "VIDEO")]
    Online,
}

impl fmt::Display for AppointmentModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentModality::InPerson => write!(f, "IN_PERSON"),
            AppointmentModality::Online => write!(f, "ONLINE"),
        }
    }
}

/// Canonical appointment lifecycle.
///
/// The basic 5-state spelling used by older endpoints (`PENDING`, `APPROVED`)
/// deserializes into the same variants; see [`BasicAppointmentStatus`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[serde(alias = "PENDING")]
    PendingConfirmation,
    #[serde(alias = "APPROVED")]
    Confirmed,
    DoctorCompleted,
    Completed,
    Disputed,
    Refunded,
    Rejected,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 8] = [
        AppointmentStatus::PendingConfirmation,
        AppointmentStatus::Confirmed,
        AppointmentStatus::DoctorCompleted,
        AppointmentStatus::Completed,
        AppointmentStatus::Disputed,
        AppointmentStatus::Refunded,
        AppointmentStatus::Rejected,
        AppointmentStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Refunded
                | AppointmentStatus::Rejected
                | AppointmentStatus::Cancelled
        )
    }

    /// The approved/confirmed state, the only one a video call may be joined from.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, AppointmentStatus::Confirmed)
    }

    fn requires_doctor(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Confirmed
                | AppointmentStatus::DoctorCompleted
                | AppointmentStatus::Completed
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::PendingConfirmation => write!(f, "PENDING_CONFIRMATION"),
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::DoctorCompleted => write!(f, "DOCTOR_COMPLETED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Disputed => write!(f, "DISPUTED"),
            AppointmentStatus::Refunded => write!(f, "REFUNDED"),
            AppointmentStatus::Rejected => write!(f, "REJECTED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The 5-state status shape of the simple admin list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BasicAppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl BasicAppointmentStatus {
    pub const ALL: [BasicAppointmentStatus; 5] = [
        BasicAppointmentStatus::Pending,
        BasicAppointmentStatus::Approved,
        BasicAppointmentStatus::Rejected,
        BasicAppointmentStatus::Completed,
        BasicAppointmentStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BasicAppointmentStatus::Pending | BasicAppointmentStatus::Approved)
    }
}

impl From<BasicAppointmentStatus> for AppointmentStatus {
    fn from(status: BasicAppointmentStatus) -> Self {
        match status {
            BasicAppointmentStatus::Pending => AppointmentStatus::PendingConfirmation,
            BasicAppointmentStatus::Approved => AppointmentStatus::Confirmed,
            BasicAppointmentStatus::Rejected => AppointmentStatus::Rejected,
            BasicAppointmentStatus::Completed => AppointmentStatus::Completed,
            BasicAppointmentStatus::Cancelled => AppointmentStatus::Cancelled,
        }
    }
}

/// User-initiated operations on an appointment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    AssignDoctor,
    #[serde(alias = "confirm")]
    Approve,
    Reject,
    JoinVideoCall,
    Complete,
    Cancel,
    ConfirmCompletion,
    ResolveDispute,
}

impl fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentAction::AssignDoctor => "assign_doctor",
            AppointmentAction::Approve => "approve",
            AppointmentAction::Reject => "reject",
            AppointmentAction::JoinVideoCall => "join_video_call",
            AppointmentAction::Complete => "complete",
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::ConfirmCompletion => "confirm_completion",
            AppointmentAction::ResolveDispute => "resolve_dispute",
        };
        f.write_str(name)
    }
}

/// Outcome chosen when closing a dispute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeResolution {
    Completed,
    Refunded,
}

impl From<DisputeResolution> for AppointmentStatus {
    fn from(resolution: DisputeResolution) -> Self {
        match resolution {
            DisputeResolution::Completed => AppointmentStatus::Completed,
            DisputeResolution::Refunded => AppointmentStatus::Refunded,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDoctorRequest {
    pub doctor_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteAppointmentRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveDisputeRequest {
    pub resolution: DisputeResolution,
}

/// Appointment plus the actions the console may offer for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub available_actions: Vec<AppointmentAction>,
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        let available_actions = appointment.available_actions();
        Self { appointment, available_actions }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment {0} has no doctor assigned")]
    DoctorNotAssigned(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl AppointmentError {
    /// Text to show the user: the server's own message for backend failures.
    pub fn user_message(&self) -> String {
        match self {
            AppointmentError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<shared_backend::BackendError>() {
            Some(backend) if backend.status == 404 => AppointmentError::NotFound,
            Some(backend) => AppointmentError::Backend {
                status: backend.status,
                message: backend.message.clone(),
            },
            None => AppointmentError::Transport(err.to_string()),
        }
    }
}
