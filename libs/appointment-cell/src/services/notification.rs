// libs/appointment-cell/src/services/notification.rs
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::models::AppointmentAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Failure,
}

/// One toast-style message for the operator who triggered the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// User id of the operator the message is for.
    #[serde(skip)]
    pub viewer: String,
    pub level: NotificationLevel,
    pub action: AppointmentAction,
    pub appointment_id: i64,
    pub message: String,
}

/// Surface that shows notifications to the operator.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Fans notifications out to any number of subscribers.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        // no subscribers is fine, the message is simply not shown
        if self.sender.send(notification).is_err() {
            debug!("Notification dropped: no subscribers");
        }
    }
}

/// Writes notifications to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => info!(
                "[{} #{}] {}",
                notification.action, notification.appointment_id, notification.message
            ),
            NotificationLevel::Failure => warn!(
                "[{} #{}] {}",
                notification.action, notification.appointment_id, notification.message
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    ActionSucceeded(AppointmentAction),
    ActionFailed(AppointmentAction),
}

/// Turns a message key into operator-facing text.
pub trait Localizer: Send + Sync {
    /// `detail` is appended verbatim when present (raw server messages).
    fn message(&self, key: MessageKey, detail: Option<&str>) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishMessages;

impl EnglishMessages {
    fn success_text(action: AppointmentAction) -> &'static str {
        match action {
            AppointmentAction::AssignDoctor => "Doctor assigned",
            AppointmentAction::Approve => "Appointment approved",
            AppointmentAction::Reject => "Appointment rejected",
            AppointmentAction::JoinVideoCall => "Joined the video call",
            AppointmentAction::Complete => "Appointment marked as completed",
            AppointmentAction::Cancel => "Appointment cancelled",
            AppointmentAction::ConfirmCompletion => "Completion confirmed",
            AppointmentAction::ResolveDispute => "Dispute resolved",
        }
    }

    fn failure_text(action: AppointmentAction) -> &'static str {
        match action {
            AppointmentAction::AssignDoctor => "Could not assign the doctor",
            AppointmentAction::Approve => "Could not approve the appointment",
            AppointmentAction::Reject => "Could not reject the appointment",
            AppointmentAction::JoinVideoCall => "Could not join the video call",
            AppointmentAction::Complete => "Could not complete the appointment",
            AppointmentAction::Cancel => "Could not cancel the appointment",
            AppointmentAction::ConfirmCompletion => "Could not confirm completion",
            AppointmentAction::ResolveDispute => "Could not resolve the dispute",
        }
    }
}

impl Localizer for EnglishMessages {
    fn message(&self, key: MessageKey, detail: Option<&str>) -> String {
        let base = match key {
            MessageKey::ActionSucceeded(action) => Self::success_text(action),
            MessageKey::ActionFailed(action) => Self::failure_text(action),
        };

        match detail {
            Some(detail) if !detail.is_empty() => format!("{}: {}", base, detail),
            _ => base.to_string(),
        }
    }
}
