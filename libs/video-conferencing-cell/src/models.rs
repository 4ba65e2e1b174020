// libs/video-conferencing-cell/src/models.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use appointment_cell::services::IneligibleReason;

// ==============================================================================
// SESSION MODELS
// ==============================================================================

/// Server-issued credentials for one join attempt. Never cached.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoCredentials {
    pub app_id: String,
    pub channel_name: String,
    pub token: String,
    pub uid: u32,
}

impl fmt::Debug for VideoCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoCredentials")
            .field("app_id", &self.app_id)
            .field("channel_name", &self.channel_name)
            .field("token", &"<redacted>")
            .field("uid", &self.uid)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Joined,
    Error(String),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Joined => write!(f, "joined"),
            SessionState::Error(message) => write!(f, "error: {}", message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Remote-participant callbacks of the media SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantEvent {
    UserPublished { uid: u32, kind: MediaKind },
    UserUnpublished { uid: u32, kind: MediaKind },
    UserLeft { uid: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteParticipant {
    pub uid: u32,
    pub audio: bool,
    pub video: bool,
}

impl RemoteParticipant {
    pub fn new(uid: u32) -> Self {
        Self { uid, audio: false, video: false }
    }

    pub fn publishes_anything(&self) -> bool {
        self.audio || self.video
    }

    pub fn set_track(&mut self, kind: MediaKind, present: bool) {
        match kind {
            MediaKind::Audio => self.audio = present,
            MediaKind::Video => self.video = present,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Failures reported by the media SDK.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("{kind} device unavailable: {message}")]
    DeviceUnavailable { kind: MediaKind, message: String },

    #[error("Permission denied for {0}")]
    PermissionDenied(MediaKind),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VideoSessionError {
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Why a join attempt did not produce a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Video call not available: {0}")]
    NotEligible(IneligibleReason),

    #[error("Could not fetch video token: {0}")]
    TokenFetch(String),

    #[error("Could not start video session: {0}")]
    Session(#[from] VideoSessionError),
}

impl JoinError {
    /// Whether trying again unchanged may succeed. Eligibility only changes with time or status.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JoinError::TokenFetch(_) | JoinError::Session(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_token() {
        let credentials = VideoCredentials {
            app_id: "app".into(),
            channel_name: "appointment-7".into(),
            token: "secret-token".into(),
            uid: 3,
        };
        let printed = format!("{:?}", credentials);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("appointment-7"));
    }

    #[test]
    fn credentials_wire_format() {
        let credentials: VideoCredentials = serde_json::from_value(serde_json::json!({
            "appId": "app",
            "channelName": "appointment-7",
            "token": "t",
            "uid": 42
        }))
        .unwrap();
        assert_eq!(credentials.uid, 42);
        assert_eq!(credentials.channel_name, "appointment-7");
    }

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(!JoinError::NotEligible(IneligibleReason::NotStarted).is_retryable());
        assert!(JoinError::TokenFetch("timeout".into()).is_retryable());
        assert!(JoinError::Session(MediaError::PermissionDenied(MediaKind::Video).into()).is_retryable());
    }

    #[test]
    fn error_state_serializes_with_message() {
        let json = serde_json::to_value(SessionState::Error("camera busy".into())).unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["message"], "camera busy");
    }
}
