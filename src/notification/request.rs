//! Notification request values and identifier wire format.
//!
//! Identifiers are the contract with the OS scheduler: the terminal alert
//! for a timer is keyed by the bare timer uuid, and each member of the
//! bounded post-expiry banner run by `"{uuid}_{n}"`. Prefix cancellation
//! relies on the bare uuid being a prefix of every member.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Metadata key carrying the owning timer id.
pub const META_TIMER_ID: &str = "timerId";

/// Identifier of the terminal notification for a timer.
#[must_use]
pub fn terminal_id(timer_id: Uuid) -> String {
    timer_id.to_string()
}

/// Identifier of the `n`-th repeat banner for a timer.
#[must_use]
pub fn repeat_id(timer_id: Uuid, n: u32) -> String {
    format!("{timer_id}_{n}")
}

/// Cancellation prefix covering the terminal alert and every repeat.
#[must_use]
pub fn id_prefix(timer_id: Uuid) -> String {
    timer_id.to_string()
}

/// Extracts the owning timer id from a notification identifier.
///
/// Accepts both the terminal form and the `"{uuid}_{n}"` repeat form.
#[must_use]
pub fn owner_of(notification_id: &str) -> Option<Uuid> {
    let uuid_part = notification_id
        .split_once('_')
        .map_or(notification_id, |(head, _)| head);
    Uuid::parse_str(uuid_part).ok()
}

/// A single scheduled local-notification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Scheduler identifier (terminal or repeat wire format)
    pub id: String,
    /// Notification title
    pub title: String,
    /// Notification body (sanitized label or default text)
    pub body: String,
    /// Whether delivery plays the alert sound
    pub sound: bool,
    /// Absolute delivery instant
    pub fire_at: DateTime<Utc>,
    /// Free-form metadata; carries [`META_TIMER_ID`]
    pub metadata: HashMap<String, String>,
}

impl NotificationRequest {
    /// Creates a request owned by `timer_id`, stamping the metadata.
    #[must_use]
    pub fn new(
        id: String,
        title: &str,
        body: &str,
        sound: bool,
        fire_at: DateTime<Utc>,
        timer_id: Uuid,
    ) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(META_TIMER_ID.to_string(), timer_id.to_string());
        Self {
            id,
            title: title.to_string(),
            body: body.to_string(),
            sound,
            fire_at,
            metadata,
        }
    }

    /// Seconds until delivery from `now`, clamped to zero.
    #[must_use]
    pub fn fire_after(&self, now: DateTime<Utc>) -> u64 {
        (self.fire_at - now).num_seconds().max(0) as u64
    }
}
