// libs/video-conferencing-cell/src/services/session.rs
//! Video session controller.
//!
//! Owns at most one live session: the channel membership, one microphone
//! track, one camera track and the roster of remote participants. Join and
//! leave are serialized, so a second join waits for the first to settle and
//! then replaces it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::models::{
    MediaError, ParticipantEvent, RemoteParticipant, SessionState, VideoCredentials,
    VideoSessionError,
};
use crate::services::media::{LocalTrack, MediaSdk};
use crate::services::roster::Roster;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct LocalTracks {
    microphone: Option<Arc<dyn LocalTrack>>,
    camera: Option<Arc<dyn LocalTrack>>,
}

impl LocalTracks {
    fn take_all(&mut self) -> Vec<Arc<dyn LocalTrack>> {
        self.microphone.take().into_iter().chain(self.camera.take()).collect()
    }

    fn is_empty(&self) -> bool {
        self.microphone.is_none() && self.camera.is_none()
    }
}

struct ControllerInner {
    sdk: Arc<dyn MediaSdk>,
    /// Held for the whole of a join or leave.
    op_lock: tokio::sync::Mutex<()>,
    in_channel: AtomicBool,
    tracks: Mutex<LocalTracks>,
    roster: Arc<Mutex<Roster>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<SessionState>,
}

impl ControllerInner {
    fn set_state(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!("Video session state: {} -> {}", current, next);
            *current = next;
            true
        });
    }

    fn has_resources(&self) -> bool {
        self.in_channel.load(Ordering::SeqCst) || !lock(&self.tracks).is_empty()
    }

    async fn connect(&self, credentials: &VideoCredentials) -> Result<(), MediaError> {
        // subscribe before joining so publishes racing the join are not lost
        let events = self.sdk.events();

        self.sdk
            .join(&credentials.app_id, &credentials.channel_name, &credentials.token, credentials.uid)
            .await?;
        self.in_channel.store(true, Ordering::SeqCst);
        self.start_pump(events);

        // stored as soon as created so a later failure still releases them
        let microphone = self.sdk.create_microphone_track().await?;
        lock(&self.tracks).microphone = Some(microphone.clone());

        let camera = self.sdk.create_camera_track().await?;
        lock(&self.tracks).camera = Some(camera.clone());

        self.sdk.publish(&[microphone, camera]).await?;
        Ok(())
    }

    fn start_pump(&self, mut events: broadcast::Receiver<ParticipantEvent>) {
        let sdk = self.sdk.clone();
        let roster = self.roster.clone();

        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Participant event stream lagged, {} events skipped", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                if let ParticipantEvent::UserPublished { uid, kind } = event {
                    if let Err(e) = sdk.subscribe(uid, kind).await {
                        warn!("Could not subscribe to {} of participant {}: {}", kind, uid, e);
                        continue;
                    }
                }

                lock(&roster).apply(&event);
            }
        });

        if let Some(previous) = lock(&self.pump).replace(handle) {
            previous.abort();
        }
    }

    /// Releases everything the session holds. Safe to call repeatedly.
    async fn teardown(&self) {
        let pump = lock(&self.pump).take();
        if let Some(pump) = pump {
            pump.abort();
            // an event already being applied finishes before the roster is cleared
            let _ = pump.await;
        }

        let tracks = lock(&self.tracks).take_all();

        if self.in_channel.swap(false, Ordering::SeqCst) {
            if !tracks.is_empty() {
                if let Err(e) = self.sdk.unpublish(&tracks).await {
                    warn!("Unpublish during teardown failed: {}", e);
                }
            }
            for track in &tracks {
                track.close();
            }
            if let Err(e) = self.sdk.leave().await {
                warn!("Leaving the channel failed: {}", e);
            }
        } else {
            for track in &tracks {
                track.close();
            }
        }

        lock(&self.roster).clear();
    }
}

pub struct VideoSessionController {
    inner: Arc<ControllerInner>,
}

impl VideoSessionController {
    pub fn new(sdk: Arc<dyn MediaSdk>) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            inner: Arc::new(ControllerInner {
                sdk,
                op_lock: tokio::sync::Mutex::new(()),
                in_channel: AtomicBool::new(false),
                tracks: Mutex::new(LocalTracks::default()),
                roster: Arc::new(Mutex::new(Roster::new())),
                pump: Mutex::new(None),
                state,
            }),
        }
    }

    /// Joins the channel and publishes microphone and camera.
    ///
    /// An existing session is left first. On failure everything acquired so
    /// far is released and the state becomes [`SessionState::Error`].
    #[instrument(skip(self, credentials), fields(channel = %credentials.channel_name, uid = credentials.uid))]
    pub async fn join(&self, credentials: &VideoCredentials) -> Result<(), VideoSessionError> {
        let _op = self.inner.op_lock.lock().await;

        if self.inner.has_resources() {
            info!("Superseding the current video session");
            self.inner.teardown().await;
        }

        self.inner.set_state(SessionState::Connecting);

        match self.inner.connect(credentials).await {
            Ok(()) => {
                info!("Joined video channel {}", credentials.channel_name);
                self.inner.set_state(SessionState::Joined);
                Ok(())
            }
            Err(err) => {
                error!("Joining video channel {} failed: {}", credentials.channel_name, err);
                self.inner.teardown().await;
                self.inner.set_state(SessionState::Error(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Releases tracks, leaves the channel and resets to idle. No-op when idle.
    pub async fn leave(&self) {
        let _op = self.inner.op_lock.lock().await;

        if self.inner.has_resources() {
            info!("Leaving video session");
            self.inner.teardown().await;
        }
        self.inner.set_state(SessionState::Idle);
    }

    /// Flips the microphone; returns whether it is now enabled, or `None` without one.
    pub fn toggle_mute(&self) -> Option<bool> {
        let tracks = lock(&self.inner.tracks);
        let microphone = tracks.microphone.as_ref()?;
        let enabled = !microphone.is_enabled();
        microphone.set_enabled(enabled);
        debug!("Microphone enabled: {}", enabled);
        Some(enabled)
    }

    /// Flips the camera; returns whether it is now enabled, or `None` without one.
    pub fn toggle_camera(&self) -> Option<bool> {
        let tracks = lock(&self.inner.tracks);
        let camera = tracks.camera.as_ref()?;
        let enabled = !camera.is_enabled();
        camera.set_enabled(enabled);
        debug!("Camera enabled: {}", enabled);
        Some(enabled)
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn roster(&self) -> Vec<RemoteParticipant> {
        lock(&self.inner.roster).snapshot()
    }

    pub fn is_muted(&self) -> Option<bool> {
        lock(&self.inner.tracks).microphone.as_ref().map(|track| !track.is_enabled())
    }

    pub fn is_camera_on(&self) -> Option<bool> {
        lock(&self.inner.tracks).camera.as_ref().map(|track| track.is_enabled())
    }
}

impl Drop for VideoSessionController {
    fn drop(&mut self) {
        if !self.inner.has_resources() {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                debug!("Controller dropped while in a session, scheduling leave");
                let inner = self.inner.clone();
                handle.spawn(async move {
                    let _op = inner.op_lock.lock().await;
                    inner.teardown().await;
                    inner.set_state(SessionState::Idle);
                });
            }
            Err(_) => {
                // no runtime to leave the channel on; at least free the devices
                warn!("Controller dropped outside a runtime; closing local tracks only");
                if let Some(pump) = lock(&self.inner.pump).take() {
                    pump.abort();
                }
                for track in lock(&self.inner.tracks).take_all() {
                    track.close();
                }
            }
        }
    }
}
