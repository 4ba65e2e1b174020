// libs/video-conferencing-cell/src/test_utils.rs
//! In-memory media SDK for exercising the controller without devices or network.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::{MediaError, MediaKind, ParticipantEvent};
use crate::services::media::{LocalTrack, MediaSdk};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
pub struct FakeTrack {
    id: String,
    kind: MediaKind,
    enabled: AtomicBool,
    closed: AtomicBool,
}

impl FakeTrack {
    fn new(id: String, kind: MediaKind) -> Self {
        Self {
            id,
            kind,
            enabled: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl LocalTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Records every call. Failures can be switched on per operation.
pub struct FakeMediaSdk {
    events: broadcast::Sender<ParticipantEvent>,
    channel: Mutex<Option<String>>,
    created: Mutex<Vec<Arc<FakeTrack>>>,
    published: Mutex<Vec<String>>,
    subscriptions: Mutex<Vec<(u32, MediaKind)>>,
    joins: AtomicUsize,
    leaves: AtomicUsize,
    subscribe_calls: AtomicUsize,
    pub fail_join: AtomicBool,
    pub fail_camera: AtomicBool,
    pub fail_subscribe: AtomicBool,
    /// Blocks the calling thread for this long inside `subscribe`.
    pub subscribe_stall_ms: AtomicU64,
}

impl Default for FakeMediaSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMediaSdk {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            channel: Mutex::new(None),
            created: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            joins: AtomicUsize::new(0),
            leaves: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            fail_join: AtomicBool::new(false),
            fail_camera: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            subscribe_stall_ms: AtomicU64::new(0),
        }
    }

    /// Delivers a remote-participant event to every subscriber.
    pub fn emit(&self, event: ParticipantEvent) {
        let _ = self.events.send(event);
    }

    pub fn joined_channel(&self) -> Option<String> {
        lock(&self.channel).clone()
    }

    pub fn published_track_ids(&self) -> Vec<String> {
        lock(&self.published).clone()
    }

    pub fn created_tracks(&self) -> Vec<Arc<FakeTrack>> {
        lock(&self.created).clone()
    }

    pub fn open_tracks(&self) -> usize {
        lock(&self.created).iter().filter(|track| !track.is_closed()).count()
    }

    pub fn subscriptions(&self) -> Vec<(u32, MediaKind)> {
        lock(&self.subscriptions).clone()
    }

    /// Subscribe attempts, failed ones included.
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn join_count(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn leave_count(&self) -> usize {
        self.leaves.load(Ordering::SeqCst)
    }

    fn create_track(&self, kind: MediaKind) -> Arc<dyn LocalTrack> {
        let mut created = lock(&self.created);
        let track = Arc::new(FakeTrack::new(format!("{}-{}", kind, created.len() + 1), kind));
        created.push(track.clone());
        track
    }
}

#[async_trait]
impl MediaSdk for FakeMediaSdk {
    async fn join(&self, _app_id: &str, channel: &str, _token: &str, _uid: u32) -> Result<(), MediaError> {
        if self.fail_join.load(Ordering::SeqCst) {
            return Err(MediaError::Channel("invalid token".to_string()));
        }

        let mut current = lock(&self.channel);
        if current.is_some() {
            return Err(MediaError::Channel("already in a channel".to_string()));
        }
        *current = Some(channel.to_string());
        self.joins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn leave(&self) -> Result<(), MediaError> {
        lock(&self.channel).take();
        lock(&self.published).clear();
        self.leaves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_microphone_track(&self) -> Result<Arc<dyn LocalTrack>, MediaError> {
        Ok(self.create_track(MediaKind::Audio))
    }

    async fn create_camera_track(&self) -> Result<Arc<dyn LocalTrack>, MediaError> {
        if self.fail_camera.load(Ordering::SeqCst) {
            return Err(MediaError::DeviceUnavailable {
                kind: MediaKind::Video,
                message: "camera in use by another application".to_string(),
            });
        }
        Ok(self.create_track(MediaKind::Video))
    }

    async fn publish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), MediaError> {
        if lock(&self.channel).is_none() {
            return Err(MediaError::Publish("not in a channel".to_string()));
        }

        let mut published = lock(&self.published);
        for track in tracks {
            if published.iter().any(|id| id == track.id()) {
                return Err(MediaError::Publish(format!("{} already published", track.id())));
            }
            published.push(track.id().to_string());
        }
        Ok(())
    }

    async fn unpublish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), MediaError> {
        let mut published = lock(&self.published);
        published.retain(|id| tracks.iter().all(|track| track.id() != id));
        Ok(())
    }

    async fn subscribe(&self, uid: u32, kind: MediaKind) -> Result<(), MediaError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let stall = self.subscribe_stall_ms.load(Ordering::SeqCst);
        if stall > 0 {
            // no await point: cancellation cannot interrupt this
            std::thread::sleep(Duration::from_millis(stall));
        }
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(MediaError::Subscribe(format!("{} of {} unavailable", kind, uid)));
        }
        lock(&self.subscriptions).push((uid, kind));
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<ParticipantEvent> {
        self.events.subscribe()
    }
}
