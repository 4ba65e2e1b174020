// libs/appointment-cell/src/services/eligibility.rs
//! Video-call eligibility gate.
//!
//! [`can_join`] is a pure function of its inputs, `now` included. The result
//! goes stale as time passes, so anything displaying it should hold an
//! [`EligibilityTicker`], which re-evaluates on a fixed period and publishes
//! each result on a watch channel.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use shared_config::AppConfig;

use crate::models::{window_end, Appointment, AppointmentModality, AppointmentStatus};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    NotOnline,
    NotApproved,
    NotStarted,
    AlreadyEnded,
}

impl IneligibleReason {
    pub fn description(&self) -> &'static str {
        match self {
            IneligibleReason::NotOnline => "not an online appointment",
            IneligibleReason::NotApproved => "not approved",
            IneligibleReason::NotStarted => "not started yet",
            IneligibleReason::AlreadyEnded => "already ended",
        }
    }
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEligibility {
    pub allowed: bool,
    pub reason: Option<IneligibleReason>,
    /// Countdown to the start of the window; set only for `NotStarted`.
    pub millis_until_start: Option<i64>,
}

impl JoinEligibility {
    fn allowed() -> Self {
        Self { allowed: true, reason: None, millis_until_start: None }
    }

    fn denied(reason: IneligibleReason) -> Self {
        Self { allowed: false, reason: Some(reason), millis_until_start: None }
    }

    pub fn time_until_start(&self) -> Option<Duration> {
        self.millis_until_start.map(Duration::milliseconds)
    }
}

/// Rules are checked in order and the first failing one wins.
pub fn can_join(
    modality: AppointmentModality,
    status: AppointmentStatus,
    start: DateTime<Utc>,
    duration_minutes: i64,
    now: DateTime<Utc>,
) -> JoinEligibility {
    if modality != AppointmentModality::Online {
        return JoinEligibility::denied(IneligibleReason::NotOnline);
    }

    if !status.is_confirmed() {
        return JoinEligibility::denied(IneligibleReason::NotApproved);
    }

    if now < start {
        let mut result = JoinEligibility::denied(IneligibleReason::NotStarted);
        result.millis_until_start = Some((start - now).num_milliseconds());
        return result;
    }

    if window_end(start, duration_minutes).is_some_and(|end| now > end) {
        return JoinEligibility::denied(IneligibleReason::AlreadyEnded);
    }

    JoinEligibility::allowed()
}

pub fn can_join_appointment(appointment: &Appointment, now: DateTime<Utc>) -> JoinEligibility {
    can_join(
        appointment.modality,
        appointment.status,
        appointment.start_date_time,
        appointment.duration_minutes,
        now,
    )
}

/// Periodic re-evaluation of the gate for one appointment.
///
/// The background task is aborted when the ticker is dropped.
pub struct EligibilityTicker {
    receiver: watch::Receiver<JoinEligibility>,
    handle: JoinHandle<()>,
}

impl EligibilityTicker {
    pub fn spawn(appointment: Appointment, clock: Arc<dyn Clock>, period: StdDuration) -> Self {
        let initial = can_join_appointment(&appointment, clock.now());
        let (sender, receiver) = watch::channel(initial);

        debug!("Starting eligibility ticker for appointment {}", appointment.id);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let next = can_join_appointment(&appointment, clock.now());
                trace!("Eligibility tick for {}: {:?}", appointment.id, next);

                if sender.send(next).is_err() {
                    break;
                }
            }
        });

        Self { receiver, handle }
    }

    /// Ticker on the system clock with the configured period.
    pub fn from_config(appointment: Appointment, config: &AppConfig) -> Self {
        Self::spawn(appointment, Arc::new(SystemClock), config.eligibility_tick())
    }

    pub fn current(&self) -> JoinEligibility {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JoinEligibility> {
        self.receiver.clone()
    }
}

impl Drop for EligibilityTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-04T10:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let start = now();
        let at_start = can_join(AppointmentModality::Online, AppointmentStatus::Confirmed, start, 30, start);
        assert!(at_start.allowed);

        let at_end = can_join(
            AppointmentModality::Online,
            AppointmentStatus::Confirmed,
            start,
            30,
            start + Duration::minutes(30),
        );
        assert!(at_end.allowed);

        let after_end = can_join(
            AppointmentModality::Online,
            AppointmentStatus::Confirmed,
            start,
            30,
            start + Duration::minutes(30) + Duration::milliseconds(1),
        );
        assert_eq!(after_end.reason, Some(IneligibleReason::AlreadyEnded));
    }

    #[test]
    fn status_is_checked_before_time() {
        let result = can_join(
            AppointmentModality::Online,
            AppointmentStatus::PendingConfirmation,
            now() + Duration::hours(2),
            30,
            now(),
        );
        assert_eq!(result.reason, Some(IneligibleReason::NotApproved));
        assert_eq!(result.millis_until_start, None);
    }

    #[test]
    fn serializes_for_the_console() {
        let result = can_join(AppointmentModality::Online, AppointmentStatus::Confirmed, now() + Duration::seconds(3), 30, now());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["allowed"], false);
        assert_eq!(json["reason"], "not_started");
        assert_eq!(json["millisUntilStart"], 3000);
    }
}
