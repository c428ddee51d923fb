//! Core data types for the label-timer engine.
//!
//! This module defines the data structures used for:
//! - Timer lifecycle state (status, interaction state derivation)
//! - The timer entity and its end-time arithmetic
//! - Persisted preset records
//! - Label sanitization for notification bodies

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a sanitized label, in characters.
pub const MAX_LABEL_LEN: usize = 50;

/// Notification body used when a timer has no label.
pub const DEFAULT_NOTIFICATION_BODY: &str = "Time's up!";

// ============================================================================
// TimerStatus
// ============================================================================

/// Lifecycle status of a timer entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    /// Created but never started (template state)
    Preset,
    /// Counting down toward an absolute end time
    Running,
    /// Suspended with a snapshot of the remaining seconds
    Paused,
    /// Cancelled before expiry; remaining time discarded
    Stopped,
    /// Reached zero; entered at most once per arming
    Completed,
}

impl TimerStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Preset => "preset",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Stopped => "stopped",
            TimerStatus::Completed => "completed",
        }
    }

    /// Returns true if the timer is actively counting down.
    pub fn is_running(&self) -> bool {
        matches!(self, TimerStatus::Running)
    }
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Preset
    }
}

// ============================================================================
// InteractionState
// ============================================================================

/// Controls the UI may offer for a timer in a given status.
///
/// Derived on demand from [`TimerStatus`], never stored, so the two can
/// not drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    /// Timer can be started for the first time
    Startable,
    /// Timer can be paused or stopped
    PausableStoppable,
    /// Timer can be resumed or stopped
    ResumableStoppable,
    /// Timer can only be restarted
    Restartable,
}

impl From<TimerStatus> for InteractionState {
    fn from(status: TimerStatus) -> Self {
        match status {
            TimerStatus::Preset => InteractionState::Startable,
            TimerStatus::Running => InteractionState::PausableStoppable,
            TimerStatus::Paused => InteractionState::ResumableStoppable,
            TimerStatus::Stopped | TimerStatus::Completed => InteractionState::Restartable,
        }
    }
}

// ============================================================================
// Label sanitization
// ============================================================================

/// Sanitizes user label text before persistence or notification use.
///
/// Trims surrounding whitespace, collapses internal whitespace runs to a
/// single space, and caps the result at [`MAX_LABEL_LEN`] characters.
#[must_use]
pub fn sanitize_label(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_LABEL_LEN).collect()
}

// ============================================================================
// TimerEntity
// ============================================================================

/// A single named countdown timer.
///
/// The authoritative remaining time while running is always derived from
/// `ends_at`; `remaining_seconds` is a snapshot refreshed for display and
/// persisted across pauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerEntity {
    /// Unique identifier, immutable after creation
    pub id: Uuid,
    /// Sanitized user label (may be empty)
    pub label: String,
    /// Full countdown duration in seconds; fixed for the entity's life
    pub duration_seconds: u64,
    /// Absolute start of the current run, while running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Absolute expiry of the current run, while running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// Current lifecycle status
    pub status: TimerStatus,
    /// Cached remaining seconds (authoritative only while not running)
    pub remaining_seconds: u64,
    /// Whether the alarm plays a sound
    pub is_sound_on: bool,
    /// Whether the alarm vibrates
    pub is_vibration_on: bool,
    /// Preset this timer was started from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<Uuid>,
}

impl TimerEntity {
    /// Creates a new timer in `Preset` status from hour/minute/second fields.
    ///
    /// The label is sanitized here; callers pass raw user text.
    #[must_use]
    pub fn new(
        label: &str,
        hours: u32,
        minutes: u32,
        seconds: u32,
        is_sound_on: bool,
        is_vibration_on: bool,
    ) -> Self {
        let duration_seconds = duration_from_hms(hours, minutes, seconds);
        Self {
            id: Uuid::new_v4(),
            label: sanitize_label(label),
            duration_seconds,
            started_at: None,
            ends_at: None,
            status: TimerStatus::Preset,
            remaining_seconds: duration_seconds,
            is_sound_on,
            is_vibration_on,
            preset_id: None,
        }
    }

    /// Arms the timer: recomputes `ends_at` from `now` plus the remaining
    /// snapshot and enters `Running`.
    ///
    /// `start` and `restart` reset the snapshot to the full duration before
    /// calling this; `resume` keeps the paused snapshot.
    pub fn arm(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
        self.ends_at = Some(now + Duration::seconds(self.remaining_seconds as i64));
        self.status = TimerStatus::Running;
    }

    /// Restores the full duration, then arms. Used by start and restart.
    pub fn arm_full(&mut self, now: DateTime<Utc>) {
        self.remaining_seconds = self.duration_seconds;
        self.arm(now);
    }

    /// Pauses the timer, snapshotting the remaining seconds at `now`.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.remaining_seconds = self.remaining_at(now);
        self.started_at = None;
        self.ends_at = None;
        self.status = TimerStatus::Paused;
    }

    /// Stops the timer. Remaining time is discarded; only restart can
    /// re-arm it, at the full duration.
    pub fn stop(&mut self) {
        self.remaining_seconds = 0;
        self.started_at = None;
        self.ends_at = None;
        self.status = TimerStatus::Stopped;
    }

    /// Marks the timer completed. No absolute end time remains meaningful.
    pub fn complete(&mut self) {
        self.remaining_seconds = 0;
        self.started_at = None;
        self.ends_at = None;
        self.status = TimerStatus::Completed;
    }

    /// Remaining seconds at `now`: `max(0, ends_at - now)` while running,
    /// the cached snapshot otherwise. Never negative.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        match (self.status, self.ends_at) {
            (TimerStatus::Running, Some(ends_at)) => (ends_at - now).num_seconds().max(0) as u64,
            _ => self.remaining_seconds,
        }
    }

    /// Returns true if the timer is running and its end time has passed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        matches!(
            (self.status, self.ends_at),
            (TimerStatus::Running, Some(ends_at)) if now >= ends_at
        )
    }

    /// Notification body text: the sanitized label, or a default when empty.
    #[must_use]
    pub fn notification_body(&self) -> &str {
        if self.label.is_empty() {
            DEFAULT_NOTIFICATION_BODY
        } else {
            &self.label
        }
    }

    /// Derives the interaction state offered to the UI.
    #[must_use]
    pub fn interaction_state(&self) -> InteractionState {
        self.status.into()
    }
}

/// Converts hour/minute/second fields to a total second count.
#[must_use]
pub fn duration_from_hms(hours: u32, minutes: u32, seconds: u32) -> u64 {
    u64::from(hours) * 3600 + u64::from(minutes) * 60 + u64::from(seconds)
}

// ============================================================================
// TimerPreset
// ============================================================================

/// A durable, reusable timer template.
///
/// Serialized field names match the persisted JSON record:
/// `{id, hours, minutes, seconds, label, isSoundOn, isVibrationOn,
/// createdAt, lastUsedAt, isHiddenInList}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerPreset {
    /// Unique identifier
    pub id: Uuid,
    /// Hour component of the duration
    pub hours: u32,
    /// Minute component of the duration
    pub minutes: u32,
    /// Second component of the duration
    pub seconds: u32,
    /// Sanitized label
    pub label: String,
    /// Whether timers started from this preset play a sound
    pub is_sound_on: bool,
    /// Whether timers started from this preset vibrate
    pub is_vibration_on: bool,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Last time a timer was started from this preset
    pub last_used_at: DateTime<Utc>,
    /// Hidden presets stay persisted but are excluded from the visible cap
    pub is_hidden_in_list: bool,
}

impl TimerPreset {
    /// Creates a new visible preset.
    #[must_use]
    pub fn new(
        label: &str,
        hours: u32,
        minutes: u32,
        seconds: u32,
        is_sound_on: bool,
        is_vibration_on: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hours,
            minutes,
            seconds,
            label: sanitize_label(label),
            is_sound_on,
            is_vibration_on,
            created_at: now,
            last_used_at: now,
            is_hidden_in_list: false,
        }
    }

    /// Creates a preset from a live timer snapshot ("save as preset").
    #[must_use]
    pub fn from_timer(timer: &TimerEntity, now: DateTime<Utc>) -> Self {
        let total = timer.duration_seconds;
        Self::new(
            &timer.label,
            (total / 3600) as u32,
            ((total % 3600) / 60) as u32,
            (total % 60) as u32,
            timer.is_sound_on,
            timer.is_vibration_on,
            now,
        )
    }

    /// Total duration in seconds.
    #[must_use]
    pub fn total_seconds(&self) -> u64 {
        duration_from_hms(self.hours, self.minutes, self.seconds)
    }
}

/// Fixed sample presets seeded on first launch.
#[must_use]
pub fn sample_presets(now: DateTime<Utc>) -> Vec<TimerPreset> {
    vec![
        TimerPreset::new("Soft-boiled eggs", 0, 7, 0, true, true, now),
        TimerPreset::new("Ramen", 0, 3, 0, true, true, now),
        TimerPreset::new("Stretching", 0, 10, 0, true, false, now),
        TimerPreset::new("Laundry", 1, 0, 0, false, true, now),
    ]
}

// ============================================================================
// AppPhase
// ============================================================================

/// Application lifecycle phase consumed from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    /// App is visible; in-app alarm feedback is appropriate
    Foreground,
    /// App is suspended; the OS scheduler carries the alerting
    Background,
}

impl Default for AppPhase {
    fn default() -> Self {
        AppPhase::Foreground
    }
}

// ============================================================================
// Tests
// ============================================================================
