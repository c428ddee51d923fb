//! Local-notification scheduling abstraction.
//!
//! The OS notification scheduler is shared, non-transactional state that
//! advances independently of the in-process timer model. This module keeps
//! the engine honest about that: everything goes through the
//! [`NotificationScheduler`] trait, so production talks to a real delivery
//! backend while tests drive a recording [`MockNotificationScheduler`] with
//! a manual clock.
//!
//! Two patterns are load-bearing for consistency:
//!
//! - **Prefix cancellation**: every notification id for a timer starts with
//!   the timer's uuid, so one `cancel_prefix` call revokes the terminal
//!   alert and the whole banner run, pending and delivered alike.
//! - **Cancel-then-schedule**: callers always cancel a timer's prefix before
//!   arming a new run, so a stale run can never outlive a state transition.

pub mod error;
mod request;
mod tokio_scheduler;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub use error::NotificationError;
pub use request::{
    id_prefix, owner_of, repeat_id, terminal_id, NotificationRequest, META_TIMER_ID,
};
pub use tokio_scheduler::{DeliveredNotification, TokioNotificationScheduler};

use chrono::{DateTime, Utc};

/// Thin abstraction over the OS local-notification service.
///
/// Implementations own no app state; they are side-effect sinks keyed by
/// string identifiers derived from timer ids. All methods are safe to call
/// with ids the scheduler has never seen.
pub trait NotificationScheduler {
    /// Arms one future delivery.
    ///
    /// # Errors
    ///
    /// Returns an error when the OS rejects the request (e.g. permission
    /// revoked). Callers log and continue; delivery is best-effort.
    fn schedule(&self, request: NotificationRequest) -> Result<(), NotificationError>;

    /// Removes every pending and delivered notification whose id starts
    /// with `prefix`, except ids listed in `excluding`.
    ///
    /// Idempotent: cancelling a prefix with zero matches is not an error.
    fn cancel_prefix(&self, prefix: &str, excluding: &[String]);

    /// Clears every pending and delivered notification. Full reset only.
    fn cancel_all(&self);

    /// Ids of notifications still waiting to fire.
    fn pending_ids(&self) -> Vec<String>;

    /// Ids of notifications already delivered and still visible.
    fn delivered_ids(&self) -> Vec<String>;
}

// ============================================================================
// MockNotificationScheduler
// ============================================================================

/// Recording scheduler for tests.
///
/// Holds requests in memory; `deliver_due` plays the role of the OS
/// delivering everything whose fire time has passed.
#[derive(Debug, Default)]
pub struct MockNotificationScheduler {
    pending: Mutex<Vec<NotificationRequest>>,
    delivered: Mutex<Vec<NotificationRequest>>,
    should_fail: AtomicBool,
}

impl MockNotificationScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `schedule` calls fail, simulating revoked permission.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Moves every pending request with `fire_at <= now` to the delivered
    /// list, in fire-time order, and returns the delivered batch.
    pub fn deliver_due(&self, now: DateTime<Utc>) -> Vec<NotificationRequest> {
        let mut pending = self.pending.lock().unwrap();
        let (due, remaining): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|r| r.fire_at <= now);
        *pending = remaining;

        let mut due = due;
        due.sort_by_key(|r| r.fire_at);
        self.delivered.lock().unwrap().extend(due.clone());
        due
    }

    /// Full pending requests, for assertions on fire times and bodies.
    #[must_use]
    pub fn pending_requests(&self) -> Vec<NotificationRequest> {
        self.pending.lock().unwrap().clone()
    }

    /// Pending requests whose id starts with `prefix`.
    #[must_use]
    pub fn pending_with_prefix(&self, prefix: &str) -> Vec<NotificationRequest> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.id.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Total scheduled-and-not-cancelled count for a prefix, pending plus
    /// delivered.
    #[must_use]
    pub fn outstanding_with_prefix(&self, prefix: &str) -> usize {
        self.pending_with_prefix(prefix).len()
            + self
                .delivered
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.id.starts_with(prefix))
                .count()
    }
}

impl NotificationScheduler for MockNotificationScheduler {
    fn schedule(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::PermissionDenied);
        }
        self.pending.lock().unwrap().push(request);
        Ok(())
    }

    fn cancel_prefix(&self, prefix: &str, excluding: &[String]) {
        let keep = |r: &NotificationRequest| {
            !r.id.starts_with(prefix) || excluding.contains(&r.id)
        };
        self.pending.lock().unwrap().retain(keep);
        self.delivered.lock().unwrap().retain(keep);
    }

    fn cancel_all(&self) {
        self.pending.lock().unwrap().clear();
        self.delivered.lock().unwrap().clear();
    }

    fn pending_ids(&self) -> Vec<String> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    fn delivered_ids(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }
}
