//! Timer service: the lifecycle state machine and its notification sync.
//!
//! The service is the single logical writer for the repository and the
//! preset store. Every intent follows the same ordering discipline:
//!
//! - a transition **leaving** `Running` cancels the timer's notification
//!   prefix *before* the status write is persisted;
//! - a transition **entering** `Running` persists the repository write
//!   first and schedules notifications *after* it succeeds.
//!
//! A notification can therefore never outlive its timer's cancellation,
//! and a failed repository write never leaves an orphaned schedule.
//! Foreground reconciliation is the backstop: it re-derives every running
//! timer's fate from `ends_at` alone, trusting no OS round-trip.

mod error;

use chrono::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

pub use error::TimerServiceError;

use crate::alarm::AlarmTrigger;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::notification::{
    id_prefix, owner_of, repeat_id, terminal_id, NotificationRequest, NotificationScheduler,
};
use crate::preset::{PresetStore, PresetUpdate};
use crate::repository::TimerRepository;
use crate::types::{AppPhase, TimerEntity, TimerPreset, TimerStatus};

/// Title shared by all timer notifications.
const NOTIFICATION_TITLE: &str = "Timer";

/// Orchestrates timer lifecycle, notification scheduling, and alarms.
pub struct TimerService<S, A, C> {
    config: EngineConfig,
    repository: TimerRepository,
    presets: PresetStore,
    scheduler: S,
    alarm: A,
    clock: C,
    phase: AppPhase,
}

impl<S, A, C> TimerService<S, A, C>
where
    S: NotificationScheduler,
    A: AlarmTrigger,
    C: Clock,
{
    /// Creates a service over the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`TimerServiceError::InvalidConfig`] when `config` fails
    /// validation.
    pub fn new(
        config: EngineConfig,
        presets: PresetStore,
        scheduler: S,
        alarm: A,
        clock: C,
    ) -> Result<Self, TimerServiceError> {
        config
            .validate()
            .map_err(TimerServiceError::InvalidConfig)?;
        Ok(Self {
            config,
            repository: TimerRepository::new(),
            presets,
            scheduler,
            alarm,
            clock,
            phase: AppPhase::Foreground,
        })
    }

    /// Read access to the live timer collection.
    #[must_use]
    pub fn repository(&self) -> &TimerRepository {
        &self.repository
    }

    /// Subscribes to full-collection snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<TimerEntity>> {
        self.repository.subscribe()
    }

    /// Read access to the preset store.
    #[must_use]
    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    /// Current application phase.
    #[must_use]
    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    /// Read access to the scheduler seam.
    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Read access to the alarm seam.
    #[must_use]
    pub fn alarm(&self) -> &A {
        &self.alarm
    }

    /// The current instant as the service sees it.
    #[must_use]
    pub fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    // ========================================================================
    // Timer intents
    // ========================================================================

    /// Creates a timer in `Preset` status and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`TimerServiceError::EmptyDuration`] for a zero-length timer.
    pub fn create(
        &mut self,
        label: &str,
        hours: u32,
        minutes: u32,
        seconds: u32,
        sound_on: bool,
        vibration_on: bool,
    ) -> Result<Uuid, TimerServiceError> {
        let timer = TimerEntity::new(label, hours, minutes, seconds, sound_on, vibration_on);
        if timer.duration_seconds == 0 {
            return Err(TimerServiceError::EmptyDuration);
        }
        let id = timer.id;
        tracing::debug!(%id, label = %timer.label, "timer created");
        self.repository.add(timer);
        Ok(id)
    }

    /// Creates a timer with the configured default sound and vibration
    /// policy, for callers that carry no explicit per-timer choice.
    pub fn create_with_defaults(
        &mut self,
        label: &str,
        hours: u32,
        minutes: u32,
        seconds: u32,
    ) -> Result<Uuid, TimerServiceError> {
        self.create(
            label,
            hours,
            minutes,
            seconds,
            self.config.default_sound_on,
            self.config.default_vibration_on,
        )
    }

    /// Creates a timer from a stored preset, recording the back-link and
    /// refreshing the preset's `last_used_at`.
    pub fn create_from_preset(&mut self, preset_id: Uuid) -> Result<Uuid, TimerServiceError> {
        let preset = self
            .presets
            .get(preset_id)
            .cloned()
            .ok_or(TimerServiceError::NotFound(preset_id))?;
        if preset.total_seconds() == 0 {
            return Err(TimerServiceError::EmptyDuration);
        }

        let mut timer = TimerEntity::new(
            &preset.label,
            preset.hours,
            preset.minutes,
            preset.seconds,
            preset.is_sound_on,
            preset.is_vibration_on,
        );
        timer.preset_id = Some(preset_id);
        let id = timer.id;

        self.presets.touch(preset_id, self.clock.now())?;
        self.repository.add(timer);
        Ok(id)
    }

    /// Starts a freshly created timer at its full duration.
    pub fn start(&mut self, id: Uuid) -> Result<(), TimerServiceError> {
        let mut timer = self.get_timer(id)?;
        if timer.status != TimerStatus::Preset {
            return Err(self.invalid(id, timer.status, "start"));
        }
        self.ensure_running_capacity()?;

        timer.arm_full(self.clock.now());
        self.persist_then_schedule(timer);
        Ok(())
    }

    /// Pauses a running timer, snapshotting its remaining seconds.
    pub fn pause(&mut self, id: Uuid) -> Result<(), TimerServiceError> {
        let mut timer = self.get_timer(id)?;
        if timer.status != TimerStatus::Running {
            return Err(self.invalid(id, timer.status, "pause"));
        }

        // Leaving Running: cancel before the status write lands.
        self.scheduler.cancel_prefix(&id_prefix(id), &[]);
        timer.pause(self.clock.now());
        tracing::debug!(%id, remaining = timer.remaining_seconds, "timer paused");
        self.repository.update(timer);
        Ok(())
    }

    /// Resumes a paused timer, recomputing `ends_at` from the snapshot.
    pub fn resume(&mut self, id: Uuid) -> Result<(), TimerServiceError> {
        let mut timer = self.get_timer(id)?;
        if timer.status != TimerStatus::Paused {
            return Err(self.invalid(id, timer.status, "resume"));
        }
        self.ensure_running_capacity()?;

        timer.arm(self.clock.now());
        self.persist_then_schedule(timer);
        Ok(())
    }

    /// Stops a running or paused timer, discarding the remaining time.
    pub fn stop(&mut self, id: Uuid) -> Result<(), TimerServiceError> {
        let mut timer = self.get_timer(id)?;
        if !matches!(timer.status, TimerStatus::Running | TimerStatus::Paused) {
            return Err(self.invalid(id, timer.status, "stop"));
        }

        self.scheduler.cancel_prefix(&id_prefix(id), &[]);
        self.alarm.stop(id);
        timer.stop();
        tracing::debug!(%id, "timer stopped");
        self.repository.update(timer);
        Ok(())
    }

    /// Restarts a stopped or completed timer at its full duration.
    pub fn restart(&mut self, id: Uuid) -> Result<(), TimerServiceError> {
        let mut timer = self.get_timer(id)?;
        if !matches!(timer.status, TimerStatus::Stopped | TimerStatus::Completed) {
            return Err(self.invalid(id, timer.status, "restart"));
        }
        self.ensure_running_capacity()?;

        // A completed timer may still have delivered banners outstanding.
        self.scheduler.cancel_prefix(&id_prefix(id), &[]);
        self.alarm.stop(id);
        timer.arm_full(self.clock.now());
        self.persist_then_schedule(timer);
        Ok(())
    }

    /// Deletes a timer, returning the removed entity if it existed.
    ///
    /// Cancellation runs regardless, so deleting an id that never had
    /// notifications (or no longer exists) is safe and silent.
    pub fn delete(&mut self, id: Uuid) -> Option<TimerEntity> {
        self.scheduler.cancel_prefix(&id_prefix(id), &[]);
        self.alarm.stop(id);
        let removed = self.repository.remove(id);
        if removed.is_some() {
            tracing::debug!(%id, "timer deleted");
        }
        removed
    }

    // ========================================================================
    // Expiry, lifecycle, acknowledgment
    // ========================================================================

    /// Completes every running timer whose end time has passed.
    ///
    /// Returns the number of timers completed. Called once per second by
    /// [`run_expiry_loop`](Self::run_expiry_loop) and from reconciliation.
    pub fn complete_due(&mut self) -> usize {
        let now = self.clock.now();
        let due: Vec<TimerEntity> = self
            .repository
            .get_all()
            .into_iter()
            .filter(|t| t.is_due(now))
            .collect();

        let count = due.len();
        for timer in due {
            self.complete_timer(timer);
        }
        count
    }

    /// Consumes an application lifecycle transition.
    ///
    /// Entering `Foreground` reconciles every running timer against the
    /// wall clock.
    pub fn set_phase(&mut self, phase: AppPhase) {
        let entering_foreground = phase == AppPhase::Foreground && self.phase != phase;
        self.phase = phase;
        if entering_foreground {
            tracing::debug!("foregrounded; reconciling");
            self.reconcile();
        }
    }

    /// Re-derives running-timer state from absolute timestamps.
    ///
    /// Overdue timers are forced to `Completed` (alarm fires while
    /// foregrounded); the rest only get their display snapshot refreshed.
    /// Nothing is rescheduled: still-valid pending notifications must not
    /// be duplicated. Idempotent by construction.
    pub fn reconcile(&mut self) -> usize {
        let completed = self.complete_due();

        let now = self.clock.now();
        for mut timer in self.repository.get_all() {
            if timer.status != TimerStatus::Running {
                continue;
            }
            let remaining = timer.remaining_at(now);
            if remaining != timer.remaining_seconds {
                timer.remaining_seconds = remaining;
                self.repository.update(timer);
            }
        }
        completed
    }

    /// Handles the user acknowledging (tapping or dismissing) a delivered
    /// notification.
    ///
    /// Stops every in-app alarm regardless of owner, then cancels the
    /// un-delivered remainder of the same banner run, keeping the id that
    /// just fired visible.
    pub fn acknowledge_notification(&mut self, notification_id: &str) {
        self.alarm.stop_all();
        if let Some(timer_id) = owner_of(notification_id) {
            self.scheduler
                .cancel_prefix(&id_prefix(timer_id), &[notification_id.to_string()]);
        }
    }

    /// Clears all timers, notifications, and alarms. Full data reset only.
    pub fn reset(&mut self) {
        for timer in self.repository.get_all() {
            self.repository.remove(timer.id);
        }
        self.scheduler.cancel_all();
        self.alarm.stop_all();
    }

    /// Drives natural expiry once per second.
    ///
    /// Spawn as a separate task; intents go through the shared handle.
    pub async fn run_expiry_loop(service: std::sync::Arc<Mutex<Self>>)
    where
        S: Send + 'static,
        A: Send + 'static,
        C: Send + 'static,
    {
        let mut ticker = interval(tokio::time::Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            service.lock().await.complete_due();
        }
    }

    // ========================================================================
    // Preset intents
    // ========================================================================

    /// Snapshots a live timer into a new preset.
    ///
    /// Returns `Ok(false)` when the visible-preset cap is reached.
    pub fn save_as_preset(&mut self, timer_id: Uuid) -> Result<bool, TimerServiceError> {
        let timer = self.get_timer(timer_id)?;
        let saved = self.presets.add_from_timer(&timer, self.clock.now())?;
        if !saved {
            tracing::info!(cap = self.config.max_visible_presets, "preset cap reached");
        }
        Ok(saved)
    }

    /// Hides a preset from the visible list.
    pub fn hide_preset(&mut self, id: Uuid) -> Result<bool, TimerServiceError> {
        Ok(self.presets.hide(id)?)
    }

    /// Unhides a preset, refreshing its last-used timestamp.
    pub fn show_preset(&mut self, id: Uuid) -> Result<bool, TimerServiceError> {
        Ok(self.presets.show(id, self.clock.now())?)
    }

    /// Applies a partial update to a preset.
    pub fn update_preset(
        &mut self,
        id: Uuid,
        fields: PresetUpdate,
    ) -> Result<bool, TimerServiceError> {
        Ok(self.presets.update(id, fields)?)
    }

    /// Deletes a preset.
    ///
    /// While a live (running or paused) timer still references the preset,
    /// it is hidden instead of hard-deleted so the template survives the
    /// run it spawned.
    pub fn delete_preset(&mut self, id: Uuid) -> Result<bool, TimerServiceError> {
        let in_use = self.repository.get_all().iter().any(|t| {
            t.preset_id == Some(id)
                && matches!(t.status, TimerStatus::Running | TimerStatus::Paused)
        });
        if in_use {
            tracing::debug!(%id, "preset in use; hiding instead of deleting");
            return Ok(self.presets.hide(id)?);
        }
        Ok(self.presets.delete(id)?)
    }

    /// All visible presets, most recently used first.
    #[must_use]
    pub fn visible_presets(&self) -> Vec<TimerPreset> {
        self.presets.visible()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn get_timer(&self, id: Uuid) -> Result<TimerEntity, TimerServiceError> {
        self.repository
            .get(id)
            .cloned()
            .ok_or(TimerServiceError::NotFound(id))
    }

    fn invalid(&self, id: Uuid, from: TimerStatus, intent: &'static str) -> TimerServiceError {
        TimerServiceError::InvalidTransition { id, from, intent }
    }

    fn ensure_running_capacity(&self) -> Result<(), TimerServiceError> {
        let running = self
            .repository
            .get_all()
            .iter()
            .filter(|t| t.status == TimerStatus::Running)
            .count();
        if running >= self.config.max_running_timers {
            return Err(TimerServiceError::RunningLimitReached(
                self.config.max_running_timers,
            ));
        }
        Ok(())
    }

    /// Entering Running: repository write first, scheduling after.
    fn persist_then_schedule(&mut self, timer: TimerEntity) {
        self.repository.update(timer.clone());
        self.schedule_notifications(&timer);
    }

    /// Arms the terminal alert at `ends_at` plus the bounded banner run at
    /// `ends_at + n * interval`, skipping members whose fire time has
    /// already passed (covers scheduling issued late, e.g. after resume).
    ///
    /// Scheduling is optimistic: an OS rejection is logged and the timer
    /// proceeds as if armed. Reconciliation keeps the user-visible outcome
    /// correct either way.
    fn schedule_notifications(&self, timer: &TimerEntity) {
        let Some(ends_at) = timer.ends_at else {
            return;
        };
        let now = self.clock.now();
        let body = timer.notification_body();

        let mut requests = Vec::with_capacity(self.config.max_repeat_notifications as usize + 1);
        requests.push(NotificationRequest::new(
            terminal_id(timer.id),
            NOTIFICATION_TITLE,
            body,
            timer.is_sound_on,
            ends_at,
            timer.id,
        ));
        for n in 0..self.config.max_repeat_notifications {
            let fire_at =
                ends_at + Duration::seconds(i64::from(n) * i64::from(self.config.repeat_interval_secs));
            requests.push(NotificationRequest::new(
                repeat_id(timer.id, n),
                NOTIFICATION_TITLE,
                body,
                timer.is_sound_on,
                fire_at,
                timer.id,
            ));
        }

        for request in requests {
            if request.fire_at < now {
                continue;
            }
            if let Err(e) = self.scheduler.schedule(request) {
                tracing::warn!(id = %timer.id, "notification scheduling failed: {e}");
            }
        }
    }

    /// Running → Completed, exactly once per arming.
    fn complete_timer(&mut self, mut timer: TimerEntity) {
        let id = timer.id;
        // Keep delivered banners visible; revoke everything still pending.
        let delivered = self.scheduler.delivered_ids();
        self.scheduler.cancel_prefix(&id_prefix(id), &delivered);

        timer.complete();
        self.repository.update(timer.clone());
        tracing::info!(%id, label = %timer.label, "timer completed");

        if self.phase == AppPhase::Foreground {
            self.alarm.play_if_needed(&timer);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::MockAlarmTrigger;
    use crate::clock::ManualClock;
    use crate::notification::MockNotificationScheduler;

    type TestService = TimerService<MockNotificationScheduler, MockAlarmTrigger, ManualClock>;

    fn service() -> (TestService, ManualClock) {
        service_with_config(EngineConfig::default())
    }

    fn service_with_config(config: EngineConfig) -> (TestService, ManualClock) {
        let clock = ManualClock::default();
        let presets = PresetStore::in_memory(config.max_visible_presets, clock.now());
        let svc = TimerService::new(
            config,
            presets,
            MockNotificationScheduler::new(),
            MockAlarmTrigger::new(),
            clock.clone(),
        )
        .unwrap();
        (svc, clock)
    }

    fn started_timer(svc: &mut TestService, secs: u32) -> Uuid {
        let id = svc.create("Tea", 0, 0, secs, true, true).unwrap();
        svc.start(id).unwrap();
        id
    }

    mod construction_tests {
        use super::*;

        #[test]
        fn test_invalid_config_rejected() {
            let clock = ManualClock::default();
            let presets = PresetStore::in_memory(20, clock.now());
            let result = TimerService::new(
                EngineConfig::default().with_repeat_interval_secs(0),
                presets,
                MockNotificationScheduler::new(),
                MockAlarmTrigger::new(),
                clock,
            );
            assert!(matches!(result, Err(TimerServiceError::InvalidConfig(_))));
        }

        #[test]
        fn test_starts_foregrounded_and_empty() {
            let (svc, _) = service();
            assert_eq!(svc.phase(), AppPhase::Foreground);
            assert!(svc.repository().is_empty());
        }
    }

    mod create_tests {
        use super::*;

        #[test]
        fn test_create_adds_preset_status_timer() {
            let (mut svc, _) = service();
            let id = svc.create("  Tea  time ", 0, 3, 0, true, false).unwrap();

            let timer = svc.repository().get(id).unwrap();
            assert_eq!(timer.status, TimerStatus::Preset);
            assert_eq!(timer.label, "Tea time");
            assert_eq!(timer.duration_seconds, 180);
            // Nothing scheduled until start.
            assert!(svc.scheduler.pending_ids().is_empty());
        }

        #[test]
        fn test_create_zero_duration_rejected() {
            let (mut svc, _) = service();
            let result = svc.create("Nothing", 0, 0, 0, true, true);
            assert!(matches!(result, Err(TimerServiceError::EmptyDuration)));
            assert!(svc.repository().is_empty());
        }

        #[test]
        fn test_create_with_defaults_applies_config_policy() {
            let (mut svc, _) = service_with_config(EngineConfig {
                default_sound_on: true,
                default_vibration_on: false,
                ..EngineConfig::default()
            });

            let id = svc.create_with_defaults("Tea", 0, 3, 0).unwrap();

            let timer = svc.repository().get(id).unwrap();
            assert!(timer.is_sound_on);
            assert!(!timer.is_vibration_on);
        }

        #[test]
        fn test_create_from_preset_links_and_touches() {
            let (mut svc, clock) = service();
            let preset = svc.visible_presets().pop().unwrap();
            clock.advance_secs(500);

            let id = svc.create_from_preset(preset.id).unwrap();

            let timer = svc.repository().get(id).unwrap();
            assert_eq!(timer.preset_id, Some(preset.id));
            assert_eq!(timer.duration_seconds, preset.total_seconds());
            assert_eq!(
                svc.presets().get(preset.id).unwrap().last_used_at,
                clock.now()
            );
        }

        #[test]
        fn test_create_from_unknown_preset() {
            let (mut svc, _) = service();
            let result = svc.create_from_preset(Uuid::new_v4());
            assert!(matches!(result, Err(TimerServiceError::NotFound(_))));
        }
    }

    mod transition_tests {
        use super::*;

        #[test]
        fn test_start_schedules_terminal_and_repeats() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 10);

            let timer = svc.repository().get(id).unwrap();
            assert_eq!(timer.status, TimerStatus::Running);
            assert_eq!(
                timer.ends_at,
                Some(clock.now() + Duration::seconds(10))
            );

            let pending = svc.scheduler.pending_with_prefix(&id_prefix(id));
            // 1 terminal + 60 repeats
            assert_eq!(pending.len(), 61);
            assert!(pending.iter().all(|r| r.fire_at >= clock.now()));
        }

        #[test]
        fn test_start_requires_preset_status() {
            let (mut svc, _) = service();
            let id = started_timer(&mut svc, 10);

            let result = svc.start(id);
            assert!(matches!(
                result,
                Err(TimerServiceError::InvalidTransition { intent: "start", .. })
            ));
        }

        #[test]
        fn test_start_unknown_id() {
            let (mut svc, _) = service();
            assert!(matches!(
                svc.start(Uuid::new_v4()),
                Err(TimerServiceError::NotFound(_))
            ));
        }

        #[test]
        fn test_running_limit_enforced() {
            let (mut svc, _) = service_with_config(
                EngineConfig::default().with_max_running_timers(2),
            );
            started_timer(&mut svc, 60);
            started_timer(&mut svc, 60);

            let third = svc.create("third", 0, 1, 0, true, true).unwrap();
            assert!(matches!(
                svc.start(third),
                Err(TimerServiceError::RunningLimitReached(2))
            ));
            assert_eq!(
                svc.repository().get(third).unwrap().status,
                TimerStatus::Preset
            );
        }

        #[test]
        fn test_pause_cancels_notifications_and_snapshots() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 60);

            clock.advance_secs(5);
            svc.pause(id).unwrap();

            let timer = svc.repository().get(id).unwrap();
            assert_eq!(timer.status, TimerStatus::Paused);
            assert_eq!(timer.remaining_seconds, 55);
            assert!(timer.ends_at.is_none());
            assert_eq!(svc.scheduler.outstanding_with_prefix(&id_prefix(id)), 0);
        }

        #[test]
        fn test_pause_requires_running() {
            let (mut svc, _) = service();
            let id = svc.create("Tea", 0, 1, 0, true, true).unwrap();

            assert!(matches!(
                svc.pause(id),
                Err(TimerServiceError::InvalidTransition { intent: "pause", .. })
            ));
        }

        #[test]
        fn test_resume_recomputes_ends_at_from_resume_time() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 60);

            clock.advance_secs(5);
            svc.pause(id).unwrap();

            // 20 seconds pass while paused.
            clock.advance_secs(20);
            svc.resume(id).unwrap();

            let timer = svc.repository().get(id).unwrap();
            assert_eq!(timer.status, TimerStatus::Running);
            assert_eq!(
                timer.ends_at,
                Some(clock.now() + Duration::seconds(55))
            );
            assert!(!svc.scheduler.pending_with_prefix(&id_prefix(id)).is_empty());
        }

        #[test]
        fn test_pause_resume_roundtrip_preserves_remaining_exactly() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 60);
            clock.advance_secs(5);

            svc.pause(id).unwrap();
            svc.resume(id).unwrap();

            let timer = svc.repository().get(id).unwrap();
            assert_eq!(timer.remaining_at(clock.now()), 55);
        }

        #[test]
        fn test_stop_discards_remaining_and_cancels() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 60);
            clock.advance_secs(10);

            svc.stop(id).unwrap();

            let timer = svc.repository().get(id).unwrap();
            assert_eq!(timer.status, TimerStatus::Stopped);
            assert_eq!(timer.remaining_seconds, 0);
            assert_eq!(svc.scheduler.outstanding_with_prefix(&id_prefix(id)), 0);
        }

        #[test]
        fn test_stop_from_paused_allowed() {
            let (mut svc, _) = service();
            let id = started_timer(&mut svc, 60);
            svc.pause(id).unwrap();

            svc.stop(id).unwrap();
            assert_eq!(
                svc.repository().get(id).unwrap().status,
                TimerStatus::Stopped
            );
        }

        #[test]
        fn test_restart_restores_full_duration() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 60);
            clock.advance_secs(10);
            svc.stop(id).unwrap();

            clock.advance_secs(100);
            svc.restart(id).unwrap();

            let timer = svc.repository().get(id).unwrap();
            assert_eq!(timer.status, TimerStatus::Running);
            assert_eq!(
                timer.ends_at,
                Some(clock.now() + Duration::seconds(60))
            );
            assert_eq!(
                svc.scheduler.pending_with_prefix(&id_prefix(id)).len(),
                61
            );
        }

        #[test]
        fn test_restart_requires_stopped_or_completed() {
            let (mut svc, _) = service();
            let id = started_timer(&mut svc, 60);

            assert!(matches!(
                svc.restart(id),
                Err(TimerServiceError::InvalidTransition { intent: "restart", .. })
            ));
        }

        #[test]
        fn test_delete_removes_and_cancels() {
            let (mut svc, _) = service();
            let id = started_timer(&mut svc, 60);

            let removed = svc.delete(id);

            assert_eq!(removed.unwrap().id, id);
            assert!(svc.repository().get(id).is_none());
            assert_eq!(svc.scheduler.outstanding_with_prefix(&id_prefix(id)), 0);
        }

        #[test]
        fn test_delete_never_started_timer_is_clean() {
            let (mut svc, _) = service();
            let id = svc.create("Tea", 0, 1, 0, true, true).unwrap();

            let removed = svc.delete(id);

            assert!(removed.is_some());
            assert!(svc.repository().get(id).is_none());
        }

        #[test]
        fn test_delete_unknown_id_is_noop() {
            let (mut svc, _) = service();
            assert!(svc.delete(Uuid::new_v4()).is_none());
        }
    }

    mod expiry_tests {
        use super::*;

        #[test]
        fn test_complete_due_transitions_and_alarms() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 10);

            clock.advance_secs(10);
            let completed = svc.complete_due();

            assert_eq!(completed, 1);
            assert_eq!(
                svc.repository().get(id).unwrap().status,
                TimerStatus::Completed
            );
            assert_eq!(svc.alarm.invocation_count(), 1);
        }

        #[test]
        fn test_complete_due_ignores_not_yet_due() {
            let (mut svc, clock) = service();
            started_timer(&mut svc, 10);

            clock.advance_secs(9);
            assert_eq!(svc.complete_due(), 0);
            assert_eq!(svc.alarm.invocation_count(), 0);
        }

        #[test]
        fn test_completion_keeps_delivered_banners() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 10);

            clock.advance_secs(10);
            // The OS delivers the terminal alert and the first banner.
            svc.scheduler.deliver_due(clock.now());
            svc.complete_due();

            let delivered = svc.scheduler.delivered_ids();
            assert!(delivered.contains(&terminal_id(id)));
            // Everything not yet delivered is gone.
            assert!(svc.scheduler.pending_with_prefix(&id_prefix(id)).is_empty());
        }

        #[test]
        fn test_no_alarm_while_backgrounded() {
            let (mut svc, clock) = service();
            started_timer(&mut svc, 10);

            svc.set_phase(AppPhase::Background);
            clock.advance_secs(10);
            svc.complete_due();

            assert_eq!(svc.alarm.invocation_count(), 0);
        }

        #[test]
        fn test_completed_timer_not_rearmed_by_reevaluation() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 10);

            clock.advance_secs(10);
            svc.complete_due();
            clock.advance_secs(10);
            svc.complete_due();

            assert_eq!(
                svc.repository().get(id).unwrap().status,
                TimerStatus::Completed
            );
            assert_eq!(svc.alarm.invocation_count(), 1);
        }
    }

    mod reconcile_tests {
        use super::*;

        #[test]
        fn test_foreground_after_expiry_completes_with_one_alarm() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 10);

            svc.set_phase(AppPhase::Background);
            clock.advance_secs(30);
            svc.set_phase(AppPhase::Foreground);

            assert_eq!(
                svc.repository().get(id).unwrap().status,
                TimerStatus::Completed
            );
            assert_eq!(svc.alarm.invocation_count(), 1);
        }

        #[test]
        fn test_reconcile_refreshes_display_without_rescheduling() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 60);
            let scheduled_before = svc.scheduler.pending_with_prefix(&id_prefix(id));

            svc.set_phase(AppPhase::Background);
            clock.advance_secs(20);
            svc.set_phase(AppPhase::Foreground);

            let timer = svc.repository().get(id).unwrap();
            assert_eq!(timer.status, TimerStatus::Running);
            assert_eq!(timer.remaining_seconds, 40);
            // The original schedule is still valid and untouched.
            assert_eq!(
                svc.scheduler.pending_with_prefix(&id_prefix(id)),
                scheduled_before
            );
        }

        #[test]
        fn test_reconcile_is_idempotent() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 10);

            clock.advance_secs(30);
            svc.reconcile();
            let status_after_first = svc.repository().get(id).unwrap().status;
            let alarms_after_first = svc.alarm.invocation_count();

            svc.reconcile();

            assert_eq!(svc.repository().get(id).unwrap().status, status_after_first);
            assert_eq!(svc.alarm.invocation_count(), alarms_after_first);
        }

        #[test]
        fn test_redundant_foreground_signal_does_not_reconcile_twice() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 60);
            svc.set_phase(AppPhase::Background);
            clock.advance_secs(10);

            svc.set_phase(AppPhase::Foreground);
            svc.set_phase(AppPhase::Foreground);

            assert_eq!(svc.repository().get(id).unwrap().remaining_seconds, 50);
        }
    }

    mod acknowledge_tests {
        use super::*;

        #[test]
        fn test_acknowledge_stops_all_alarms_and_trims_run() {
            let (mut svc, clock) = service();
            let id = started_timer(&mut svc, 10);

            clock.advance_secs(10);
            svc.scheduler.deliver_due(clock.now());
            svc.complete_due();

            svc.acknowledge_notification(&terminal_id(id));

            assert_eq!(svc.alarm.stop_all_count(), 1);
            // The acknowledged id stays; the rest of the run is gone.
            assert_eq!(svc.scheduler.delivered_ids(), vec![terminal_id(id)]);
            assert!(svc.scheduler.pending_with_prefix(&id_prefix(id)).is_empty());
        }

        #[test]
        fn test_acknowledge_foreign_id_still_stops_alarms() {
            let (mut svc, _) = service();
            svc.acknowledge_notification("not-a-uuid");
            assert_eq!(svc.alarm.stop_all_count(), 1);
        }
    }

    mod scheduling_policy_tests {
        use super::*;

        #[test]
        fn test_repeat_run_is_spaced_by_interval() {
            let (mut svc, clock) = service_with_config(
                EngineConfig::default()
                    .with_max_repeat_notifications(3)
                    .with_repeat_interval_secs(5),
            );
            let id = started_timer(&mut svc, 10);
            let ends_at = clock.now() + Duration::seconds(10);

            let mut pending = svc.scheduler.pending_with_prefix(&id_prefix(id));
            pending.sort_by_key(|r| r.fire_at);

            // terminal + repeat 0 at ends_at, then +5s, +10s
            let fire_times: Vec<_> = pending.iter().map(|r| r.fire_at).collect();
            assert_eq!(
                fire_times,
                vec![
                    ends_at,
                    ends_at,
                    ends_at + Duration::seconds(5),
                    ends_at + Duration::seconds(10),
                ]
            );
        }

        #[test]
        fn test_late_scheduling_skips_past_members() {
            let (mut svc, clock) = service_with_config(
                EngineConfig::default()
                    .with_max_repeat_notifications(10)
                    .with_repeat_interval_secs(1),
            );
            let id = started_timer(&mut svc, 30);
            clock.advance_secs(2);
            svc.pause(id).unwrap();

            // Resume with 28s left; all members are in the future again.
            clock.advance_secs(60);
            svc.resume(id).unwrap();

            let now = clock.now();
            let pending = svc.scheduler.pending_with_prefix(&id_prefix(id));
            assert_eq!(pending.len(), 11);
            assert!(pending.iter().all(|r| r.fire_at >= now));
        }

        #[test]
        fn test_scheduling_failure_is_optimistic() {
            let (mut svc, _) = service();
            svc.scheduler.set_should_fail(true);

            let id = svc.create("Tea", 0, 0, 10, true, true).unwrap();
            // Start succeeds even though every schedule call fails.
            svc.start(id).unwrap();

            assert_eq!(
                svc.repository().get(id).unwrap().status,
                TimerStatus::Running
            );
            assert!(svc.scheduler.pending_ids().is_empty());
        }

        #[test]
        fn test_notification_body_uses_label_or_default() {
            let (mut svc, _) = service();
            let id = svc.create("   ", 0, 0, 10, true, true).unwrap();
            svc.start(id).unwrap();

            let pending = svc.scheduler.pending_with_prefix(&id_prefix(id));
            assert!(pending
                .iter()
                .all(|r| r.body == crate::types::DEFAULT_NOTIFICATION_BODY));
        }
    }

    mod preset_intent_tests {
        use super::*;

        fn clear_seed(svc: &mut TestService) {
            let ids: Vec<_> = svc.presets().get_all().iter().map(|p| p.id).collect();
            for id in ids {
                svc.presets.delete(id).unwrap();
            }
        }

        #[test]
        fn test_save_as_preset_snapshots_timer() {
            let (mut svc, _) = service();
            let id = started_timer(&mut svc, 180);

            assert!(svc.save_as_preset(id).unwrap());
            assert!(svc
                .visible_presets()
                .iter()
                .any(|p| p.label == "Tea" && p.total_seconds() == 180));
        }

        #[test]
        fn test_save_as_preset_respects_cap() {
            let (mut svc, _) = service_with_config(
                EngineConfig::default().with_max_visible_presets(4),
            );
            // Seed already fills the cap of 4.
            let id = started_timer(&mut svc, 60);

            assert!(!svc.save_as_preset(id).unwrap());
            assert_eq!(svc.presets().visible_count(), 4);
        }

        #[test]
        fn test_delete_preset_in_use_hides_instead() {
            let (mut svc, _) = service();
            let preset = svc.visible_presets().pop().unwrap();
            let timer_id = svc.create_from_preset(preset.id).unwrap();
            svc.start(timer_id).unwrap();

            assert!(svc.delete_preset(preset.id).unwrap());

            // Still stored, just hidden.
            let stored = svc.presets().get(preset.id).unwrap();
            assert!(stored.is_hidden_in_list);
        }

        #[test]
        fn test_delete_preset_not_in_use_hard_deletes() {
            let (mut svc, _) = service();
            let preset = svc.visible_presets().pop().unwrap();
            let timer_id = svc.create_from_preset(preset.id).unwrap();
            svc.start(timer_id).unwrap();
            svc.stop(timer_id).unwrap();

            assert!(svc.delete_preset(preset.id).unwrap());
            assert!(svc.presets().get(preset.id).is_none());
        }

        #[test]
        fn test_hide_show_update_roundtrip() {
            let (mut svc, _) = service();
            clear_seed(&mut svc);
            let id = started_timer(&mut svc, 180);
            svc.save_as_preset(id).unwrap();
            let preset_id = svc.visible_presets()[0].id;

            assert!(svc.hide_preset(preset_id).unwrap());
            assert!(svc.visible_presets().is_empty());

            assert!(svc.show_preset(preset_id).unwrap());
            assert_eq!(svc.visible_presets().len(), 1);

            assert!(svc
                .update_preset(
                    preset_id,
                    PresetUpdate {
                        label: Some("Renamed".to_string()),
                        ..Default::default()
                    }
                )
                .unwrap());
            assert_eq!(svc.presets().get(preset_id).unwrap().label, "Renamed");
        }
    }

    mod reset_tests {
        use super::*;

        #[test]
        fn test_reset_clears_everything() {
            let (mut svc, _) = service();
            started_timer(&mut svc, 60);
            started_timer(&mut svc, 120);

            svc.reset();

            assert!(svc.repository().is_empty());
            assert!(svc.scheduler.pending_ids().is_empty());
            assert!(svc.alarm.stop_all_count() >= 1);
        }
    }
}
