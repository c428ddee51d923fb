//! In-memory timer repository.
//!
//! Single source of truth for live [`TimerEntity`] values. Every mutation
//! publishes the full collection over a `tokio::sync::watch` channel so UI
//! observers always render from one snapshot. Business invariants are the
//! service's job; the repository only matches on ids.

use tokio::sync::watch;
use uuid::Uuid;

use crate::types::TimerEntity;

/// Observable in-memory collection of timer entities.
///
/// Intended to be mutated from a single logical writer (the service); it
/// carries no internal locking of its own.
pub struct TimerRepository {
    /// Entities in insertion order
    timers: Vec<TimerEntity>,
    /// Publishes the full collection on every mutation
    snapshot_tx: watch::Sender<Vec<TimerEntity>>,
}

impl TimerRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        Self {
            timers: Vec::new(),
            snapshot_tx,
        }
    }

    /// Subscribes to full-collection snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<TimerEntity>> {
        self.snapshot_tx.subscribe()
    }

    /// Returns a copy of all entities in insertion order.
    #[must_use]
    pub fn get_all(&self) -> Vec<TimerEntity> {
        self.timers.clone()
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&TimerEntity> {
        self.timers.iter().find(|t| t.id == id)
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns true if no entities are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Adds an entity and publishes the new collection.
    pub fn add(&mut self, timer: TimerEntity) {
        self.timers.push(timer);
        self.publish();
    }

    /// Replaces the entity with the same id. No-op if the id is absent.
    pub fn update(&mut self, timer: TimerEntity) {
        if let Some(slot) = self.timers.iter_mut().find(|t| t.id == timer.id) {
            *slot = timer;
            self.publish();
        }
    }

    /// Removes an entity by id, returning it if it existed.
    pub fn remove(&mut self, id: Uuid) -> Option<TimerEntity> {
        let index = self.timers.iter().position(|t| t.id == id)?;
        let removed = self.timers.remove(index);
        self.publish();
        Some(removed)
    }

    fn publish(&self) {
        // send_replace never fails even with zero subscribers.
        self.snapshot_tx.send_replace(self.timers.clone());
    }
}

impl Default for TimerRepository {
    fn default() -> Self {
        Self::new()
    }
}
