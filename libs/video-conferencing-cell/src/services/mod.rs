// libs/video-conferencing-cell/src/services/mod.rs

pub mod integration;
pub mod media;
pub mod roster;
pub mod session;
pub mod token;

pub use integration::VideoCallService;
pub use media::{LocalTrack, MediaSdk};
pub use roster::Roster;
pub use session::VideoSessionController;
pub use token::{HttpVideoTokenClient, VideoTokenProvider};
