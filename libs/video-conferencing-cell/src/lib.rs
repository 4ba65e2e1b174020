// libs/video-conferencing-cell/src/lib.rs
//! # Video Conferencing Cell
//!
//! Coordinates one real-time audio/video session per appointment on top of a
//! third-party media SDK. The SDK itself is behind the [`services::MediaSdk`]
//! trait; this cell decides when a call may start, fetches the short-lived
//! token and keeps local tracks and the remote roster consistent.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------+
//! |                   Video Cell                        |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Credentials, states, events      |
//! |  services/      |                                   |
//! |    media.rs     |  Media SDK capability traits      |
//! |    session.rs   |  Session controller               |
//! |    roster.rs    |  Remote participant roster        |
//! |    token.rs     |  Video token endpoint client      |
//! |    integration.rs| Gate -> token -> join            |
//! |  test_utils.rs  |  In-memory media SDK              |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /video/health` - Configuration check
//! - `GET /video/appointments/{id}/credentials` - Gate-checked join credentials
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use video_conferencing_cell::services::{
//!     HttpVideoTokenClient, MediaSdk, VideoCallService, VideoSessionController,
//! };
//! use appointment_cell::models::Appointment;
//! use shared_config::AppConfig;
//!
//! # async fn example(sdk: Arc<dyn MediaSdk>, appointment: Appointment) {
//! let config = AppConfig::from_env();
//! let tokens = HttpVideoTokenClient::new(&config, Some("access-token".to_string()));
//! let service = VideoCallService::new(Arc::new(tokens));
//! let controller = VideoSessionController::new(sdk);
//!
//! match service.join(&appointment, &controller).await {
//!     Ok(_) => println!("in call, muted: {:?}", controller.is_muted()),
//!     Err(e) if e.is_retryable() => println!("try again: {}", e),
//!     Err(e) => println!("{}", e),
//! }
//! controller.leave().await;
//! # }
//! ```

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod test_utils;

pub use models::{JoinError, MediaKind, ParticipantEvent, SessionState, VideoCredentials};
pub use router::video_conferencing_routes;
