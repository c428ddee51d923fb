//! In-app alarm feedback seam.
//!
//! When a timer expires while the app is foregrounded, the OS banner fires
//! silently in-app; the [`AlarmTrigger`] supplies the sound/vibration the
//! user would otherwise miss. Audio-session plumbing is the host layer's
//! problem: the production [`ChannelAlarmTrigger`] only emits events, and
//! tests use the recording [`MockAlarmTrigger`].

use std::collections::HashSet;
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::types::TimerEntity;

/// Issues sound/vibration feedback for expired timers.
///
/// `play_if_needed` must be invoked on every in-app expiry even when both
/// policy flags are off, so future feedback channels can hook the same
/// call site.
pub trait AlarmTrigger {
    /// Plays the configured feedback for `timer` (sound if `is_sound_on`,
    /// vibration if `is_vibration_on`; otherwise a silent no-op).
    fn play_if_needed(&self, timer: &TimerEntity);

    /// Halts an active alarm tied to one timer. Idempotent.
    fn stop(&self, timer_id: Uuid);

    /// Halts every active alarm. Invoked whenever the user acknowledges any
    /// notification, so stale alarms never linger.
    fn stop_all(&self);
}

// ============================================================================
// AlarmEvent / ChannelAlarmTrigger
// ============================================================================

/// Feedback commands emitted to the host audio/haptics layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmEvent {
    /// Begin feedback for a timer
    Started {
        /// Owning timer
        timer_id: Uuid,
        /// Play the alarm sound
        sound: bool,
        /// Run the vibration pattern
        vibration: bool,
    },
    /// End feedback for a timer
    Stopped {
        /// Owning timer
        timer_id: Uuid,
    },
    /// End all feedback
    StoppedAll,
}

/// Production trigger that forwards alarm commands over a channel.
///
/// Tracks which timers currently have an active sound so `stop` for an
/// inactive timer emits nothing.
pub struct ChannelAlarmTrigger {
    active: Mutex<HashSet<Uuid>>,
    event_tx: mpsc::UnboundedSender<AlarmEvent>,
}

impl ChannelAlarmTrigger {
    /// Creates the trigger and the receiving end of its event channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AlarmEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Self {
                active: Mutex::new(HashSet::new()),
                event_tx,
            },
            event_rx,
        )
    }

    fn emit(&self, event: AlarmEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("alarm event channel closed");
        }
    }
}

impl AlarmTrigger for ChannelAlarmTrigger {
    fn play_if_needed(&self, timer: &TimerEntity) {
        if timer.is_sound_on {
            self.active.lock().unwrap().insert(timer.id);
        }
        // Emitted even with both flags off; the consumer decides what a
        // silent expiry looks like (e.g. a screen flash).
        self.emit(AlarmEvent::Started {
            timer_id: timer.id,
            sound: timer.is_sound_on,
            vibration: timer.is_vibration_on,
        });
    }

    fn stop(&self, timer_id: Uuid) {
        if self.active.lock().unwrap().remove(&timer_id) {
            self.emit(AlarmEvent::Stopped { timer_id });
        }
    }

    fn stop_all(&self) {
        self.active.lock().unwrap().clear();
        self.emit(AlarmEvent::StoppedAll);
    }
}

// ============================================================================
// MockAlarmTrigger
// ============================================================================

/// Recording trigger for tests.
#[derive(Debug, Default)]
pub struct MockAlarmTrigger {
    invocations: Mutex<Vec<(Uuid, bool, bool)>>,
    stops: Mutex<Vec<Uuid>>,
    stop_all_count: Mutex<usize>,
}

impl MockAlarmTrigger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `play_if_needed` invocations, silent ones included.
    #[must_use]
    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    /// Recorded invocations as `(timer_id, sound, vibration)`.
    #[must_use]
    pub fn invocations(&self) -> Vec<(Uuid, bool, bool)> {
        self.invocations.lock().unwrap().clone()
    }

    /// Recorded per-timer stop calls.
    #[must_use]
    pub fn stops(&self) -> Vec<Uuid> {
        self.stops.lock().unwrap().clone()
    }

    /// Number of `stop_all` calls.
    #[must_use]
    pub fn stop_all_count(&self) -> usize {
        *self.stop_all_count.lock().unwrap()
    }
}

impl AlarmTrigger for MockAlarmTrigger {
    fn play_if_needed(&self, timer: &TimerEntity) {
        self.invocations
            .lock()
            .unwrap()
            .push((timer.id, timer.is_sound_on, timer.is_vibration_on));
    }

    fn stop(&self, timer_id: Uuid) {
        self.stops.lock().unwrap().push(timer_id);
    }

    fn stop_all(&self) {
        *self.stop_all_count.lock().unwrap() += 1;
    }
}
