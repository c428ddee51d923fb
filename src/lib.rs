//! Labeldown — label-timer lifecycle and notification-synchronization engine.
//!
//! This library provides the core of a label-timer application:
//! - Timer entities with end-time arithmetic and a strict lifecycle
//!   (preset → running ⇄ paused, running → stopped, expiry → completed)
//! - An observable in-memory timer repository
//! - A local-notification scheduler abstraction with prefix cancellation
//!   and a bounded post-expiry banner run
//! - An in-app alarm feedback seam for foreground expiries
//! - A persisted, capped preset store with one-time sample seeding
//! - The orchestrating timer service, including foreground reconciliation
//!   that re-derives timer fate from absolute timestamps after the host
//!   app resumes
//!
//! Rendering, navigation, and audio-session plumbing are deliberately
//! not here; the host consumes repository snapshots, alarm events, and
//! notification deliveries through channels.

pub mod alarm;
pub mod clock;
pub mod config;
pub mod notification;
pub mod preset;
pub mod repository;
pub mod service;
pub mod types;

// Re-export commonly used types for convenience
pub use alarm::{AlarmEvent, AlarmTrigger, ChannelAlarmTrigger, MockAlarmTrigger};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use notification::{
    id_prefix, owner_of, repeat_id, terminal_id, DeliveredNotification, MockNotificationScheduler,
    NotificationError, NotificationRequest, NotificationScheduler, TokioNotificationScheduler,
};
pub use preset::{PresetStore, PresetStoreError, PresetUpdate};
pub use repository::TimerRepository;
pub use service::{TimerService, TimerServiceError};
pub use types::{
    duration_from_hms, sanitize_label, AppPhase, InteractionState, TimerEntity, TimerPreset,
    TimerStatus,
};
