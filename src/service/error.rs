//! Timer service error types.

use thiserror::Error;
use uuid::Uuid;

use crate::preset::PresetStoreError;
use crate::types::TimerStatus;

/// Errors surfaced by timer and preset intents.
#[derive(Debug, Error)]
pub enum TimerServiceError {
    /// No timer or preset with the given id exists.
    #[error("no entity with id {0}")]
    NotFound(Uuid),

    /// The intent is not legal from the timer's current status.
    #[error("cannot {intent} timer {id} while {from:?}")]
    InvalidTransition {
        /// Target timer
        id: Uuid,
        /// Status the timer was in
        from: TimerStatus,
        /// Requested intent
        intent: &'static str,
    },

    /// The concurrent running-timer cap is reached.
    #[error("running timer limit of {0} reached")]
    RunningLimitReached(usize),

    /// A timer with zero total duration was requested.
    #[error("timer duration must be greater than zero")]
    EmptyDuration,

    /// The injected configuration failed validation.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Persisting the preset collection failed.
    #[error(transparent)]
    PresetStore(#[from] PresetStoreError),
}
