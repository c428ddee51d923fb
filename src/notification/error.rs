//! Notification scheduler error types.

use thiserror::Error;

/// Errors that can occur while talking to the local-notification service.
///
/// The engine treats all of these as recovered-locally: scheduling failures
/// are logged and the timer proceeds as if armed, because blocking timer
/// creation on a notification round-trip would be worse for the user.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The OS rejected the scheduling request.
    #[error("notification request rejected: {0}")]
    Rejected(String),

    /// Notification permission was denied by the user.
    #[error("notification permission denied")]
    PermissionDenied,

    /// The notification service is not reachable.
    #[error("notification service unavailable")]
    Unavailable,
}

impl NotificationError {
    /// Returns true if this error is related to permissions.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}
