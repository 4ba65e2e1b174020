// libs/appointment-cell/src/services/mod.rs

pub mod api;
pub mod cache;
pub mod dispatcher;
pub mod eligibility;
pub mod lifecycle;
pub mod notification;

pub use api::{AppointmentApi, HttpAppointmentApi};
pub use cache::{QueryCache, QueryKey};
pub use dispatcher::{ActionDispatcher, DispatchError, DispatchOutcome, InFlightRegistry};
pub use eligibility::{
    can_join, can_join_appointment, Clock, EligibilityTicker, FixedClock, IneligibleReason,
    JoinEligibility, SystemClock,
};
pub use notification::{
    BroadcastNotifier, EnglishMessages, Localizer, LogNotifier, MessageKey, Notification,
    NotificationLevel, Notifier,
};
