// libs/video-conferencing-cell/src/services/media.rs
//! Capability boundary to the real-time media SDK.
//!
//! The SDK owns transport and devices. The controller only drives it through
//! these two traits; its remote-participant callbacks arrive as a broadcast
//! stream of [`ParticipantEvent`]s.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::{MediaError, MediaKind, ParticipantEvent};

/// A local microphone or camera track.
pub trait LocalTrack: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> MediaKind;

    /// Mutes or unmutes without renegotiating the connection.
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Stops capture and releases the device.
    fn close(&self);
}

#[async_trait]
pub trait MediaSdk: Send + Sync {
    async fn join(&self, app_id: &str, channel: &str, token: &str, uid: u32) -> Result<(), MediaError>;

    async fn leave(&self) -> Result<(), MediaError>;

    async fn create_microphone_track(&self) -> Result<Arc<dyn LocalTrack>, MediaError>;

    async fn create_camera_track(&self) -> Result<Arc<dyn LocalTrack>, MediaError>;

    async fn publish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), MediaError>;

    async fn unpublish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), MediaError>;

    async fn subscribe(&self, uid: u32, kind: MediaKind) -> Result<(), MediaError>;

    /// New receiver of remote-participant events.
    fn events(&self) -> broadcast::Receiver<ParticipantEvent>;
}
