// libs/appointment-cell/src/services/lifecycle.rs
//! Appointment status model. The backend is authoritative for transitions;
//! these tables mirror it so the console never offers an action the server
//! would refuse.

use tracing::{debug, warn};

use crate::models::{AppointmentAction, AppointmentError, AppointmentStatus, BasicAppointmentStatus};

impl AppointmentStatus {
    /// Legal actions for this status. Pure function of the status.
    pub fn available_actions(&self) -> Vec<AppointmentAction> {
        match self {
            AppointmentStatus::PendingConfirmation => vec![
                AppointmentAction::AssignDoctor,
                AppointmentAction::Approve,
                AppointmentAction::Reject,
            ],
            AppointmentStatus::Confirmed => vec![AppointmentAction::JoinVideoCall],
            AppointmentStatus::DoctorCompleted => vec![AppointmentAction::ConfirmCompletion],
            AppointmentStatus::Disputed => vec![AppointmentAction::ResolveDispute],
            AppointmentStatus::Completed
            | AppointmentStatus::Refunded
            | AppointmentStatus::Rejected
            | AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Statuses the backend accepts as the next step from this one.
    pub fn next_statuses(&self) -> Vec<AppointmentStatus> {
        match self {
            AppointmentStatus::PendingConfirmation => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Rejected,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::DoctorCompleted,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::DoctorCompleted => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Disputed,
            ],
            AppointmentStatus::Disputed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Refunded,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed
            | AppointmentStatus::Refunded
            | AppointmentStatus::Rejected
            | AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn validate_transition(&self, to: &AppointmentStatus) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", self, to);

        if !self.next_statuses().contains(to) {
            warn!("Invalid status transition attempted: {} -> {}", self, to);
            return Err(AppointmentError::InvalidStatusTransition { from: *self, to: *to });
        }

        Ok(())
    }
}

impl BasicAppointmentStatus {
    /// Action table of the 5-state model.
    pub fn available_actions(&self) -> Vec<AppointmentAction> {
        match self {
            BasicAppointmentStatus::Pending => vec![
                AppointmentAction::AssignDoctor,
                AppointmentAction::Approve,
                AppointmentAction::Reject,
            ],
            BasicAppointmentStatus::Approved => vec![
                AppointmentAction::JoinVideoCall,
                AppointmentAction::Complete,
                AppointmentAction::Cancel,
            ],
            BasicAppointmentStatus::Rejected
            | BasicAppointmentStatus::Completed
            | BasicAppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn next_statuses(&self) -> Vec<BasicAppointmentStatus> {
        match self {
            BasicAppointmentStatus::Pending => vec![
                BasicAppointmentStatus::Approved,
                BasicAppointmentStatus::Rejected,
            ],
            BasicAppointmentStatus::Approved => vec![
                BasicAppointmentStatus::Completed,
                BasicAppointmentStatus::Cancelled,
            ],
            _ => vec![],
        }
    }
}
