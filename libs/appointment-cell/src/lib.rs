// libs/appointment-cell/src/lib.rs
//! # Appointment Cell
//!
//! Appointment lifecycle for the clinic console: the status model, the
//! video-call eligibility gate and the action dispatcher that drives the
//! backend.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                 Appointment Cell                    |
//! +-----------------------------------------------------+
//! |  handlers.rs      |  HTTP handlers, SSE toasts      |
//! |  router.rs        |  Route definitions              |
//! |  models.rs        |  Appointment, statuses, actions |
//! |  services/        |                                 |
//! |    lifecycle.rs   |  Action and transition tables   |
//! |    eligibility.rs |  Join gate and 1s ticker        |
//! |    dispatcher.rs  |  Backend actions + invalidation |
//! |    cache.rs       |  Appointment query cache        |
//! |    notification.rs|  Operator notifications         |
//! |    api.rs         |  Backend appointment endpoints  |
//! +-----------------------------------------------------+
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use appointment_cell::services::{
//!     ActionDispatcher, EnglishMessages, HttpAppointmentApi, LogNotifier, QueryCache,
//! };
//! use shared_config::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env();
//! let dispatcher = ActionDispatcher::new(
//!     "operator-7",
//!     Arc::new(HttpAppointmentApi::new(&config, Some("token".to_string()))),
//!     Arc::new(QueryCache::new(config.query_stale_time())),
//!     Arc::new(LogNotifier),
//!     Arc::new(EnglishMessages),
//! );
//! let outcome = dispatcher.reject(42, "Doctor unavailable that week").await?;
//! println!("{}", outcome.message);
//! # Ok(())
//! # }
//! ```

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Appointment, AppointmentAction, AppointmentError, AppointmentModality, AppointmentStatus,
    BasicAppointmentStatus, DisputeResolution,
};

pub use router::appointment_routes;
