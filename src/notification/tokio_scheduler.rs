//! In-process production scheduler backed by tokio tasks.
//!
//! Each armed request becomes one spawned task held in an arena keyed by
//! notification id. A task checks its own liveness (its arena entry still
//! exists) before delivering, so a cancel that races a fire never produces
//! a stale delivery. Deliveries are surfaced over an unbounded channel; the
//! host layer forwards them to the platform's banner/alert surface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::NotificationError;
use super::request::{owner_of, NotificationRequest};
use super::NotificationScheduler;

/// A notification the scheduler has fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredNotification {
    /// Scheduler identifier (terminal or repeat wire format)
    pub id: String,
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// Whether delivery carries the alert sound
    pub sound: bool,
    /// Owning timer, parsed back out of the identifier
    pub timer_id: Option<Uuid>,
}

struct Inner {
    /// Arena of in-flight delivery tasks, keyed by notification id
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
    /// Ids already fired and still visible
    delivered: Mutex<Vec<String>>,
    delivery_tx: mpsc::UnboundedSender<DeliveredNotification>,
}

/// Tokio-task-based [`NotificationScheduler`].
///
/// Must be used from within a tokio runtime; `schedule` spawns onto the
/// current runtime.
#[derive(Clone)]
pub struct TokioNotificationScheduler {
    inner: Arc<Inner>,
}

impl TokioNotificationScheduler {
    /// Creates the scheduler and the receiving end of its delivery channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeliveredNotification>) {
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            inner: Arc::new(Inner {
                handles: Mutex::new(HashMap::new()),
                delivered: Mutex::new(Vec::new()),
                delivery_tx,
            }),
        };
        (scheduler, delivery_rx)
    }
}

impl NotificationScheduler for TokioNotificationScheduler {
    fn schedule(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        if request.id.is_empty() {
            return Err(NotificationError::Rejected(
                "empty notification identifier".to_string(),
            ));
        }
        if self.inner.delivery_tx.is_closed() {
            return Err(NotificationError::Unavailable);
        }

        let id = request.id.clone();
        let delay_ms = (request.fire_at - Utc::now()).num_milliseconds().max(0) as u64;
        let inner = Arc::clone(&self.inner);
        let task_id = id.clone();

        // The arena lock is held across spawn and insert so a zero-delay
        // task cannot race its own registration.
        let mut handles = self.inner.handles.lock().unwrap();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;

            // Liveness check: a cancelled request has no arena entry left.
            if inner.handles.lock().unwrap().remove(&task_id).is_none() {
                return;
            }

            inner.delivered.lock().unwrap().push(task_id.clone());
            let delivery = DeliveredNotification {
                timer_id: owner_of(&task_id),
                id: task_id,
                title: request.title,
                body: request.body,
                sound: request.sound,
            };
            if inner.delivery_tx.send(delivery).is_err() {
                tracing::debug!("delivery channel closed; dropping notification");
            }
        });

        // Re-arming an id replaces the previous task.
        if let Some(previous) = handles.insert(id, handle) {
            previous.abort();
        }

        Ok(())
    }

    fn cancel_prefix(&self, prefix: &str, excluding: &[String]) {
        let mut handles = self.inner.handles.lock().unwrap();
        let doomed: Vec<String> = handles
            .keys()
            .filter(|id| id.starts_with(prefix) && !excluding.contains(id))
            .cloned()
            .collect();
        for id in doomed {
            if let Some(handle) = handles.remove(&id) {
                handle.abort();
            }
        }
        drop(handles);

        self.inner
            .delivered
            .lock()
            .unwrap()
            .retain(|id| !id.starts_with(prefix) || excluding.contains(id));
    }

    fn cancel_all(&self) {
        let mut handles = self.inner.handles.lock().unwrap();
        for (_, handle) in handles.drain() {
            handle.abort();
        }
        drop(handles);
        self.inner.delivered.lock().unwrap().clear();
    }

    fn pending_ids(&self) -> Vec<String> {
        self.inner.handles.lock().unwrap().keys().cloned().collect()
    }

    fn delivered_ids(&self) -> Vec<String> {
        self.inner.delivered.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::request::terminal_id;
    use chrono::Duration;

    fn due_now(timer_id: Uuid) -> NotificationRequest {
        NotificationRequest::new(
            terminal_id(timer_id),
            "Timer",
            "Tea",
            true,
            Utc::now(),
            timer_id,
        )
    }

    #[tokio::test]
    async fn test_due_request_is_delivered() {
        let (scheduler, mut rx) = TokioNotificationScheduler::new();
        let timer_id = Uuid::new_v4();

        scheduler.schedule(due_now(timer_id)).unwrap();

        let delivered = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("delivery timed out")
            .expect("channel closed");

        assert_eq!(delivered.id, terminal_id(timer_id));
        assert_eq!(delivered.timer_id, Some(timer_id));
        assert!(delivered.sound);
        assert_eq!(scheduler.delivered_ids(), vec![terminal_id(timer_id)]);
        assert!(scheduler.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn test_empty_identifier_is_rejected() {
        let (scheduler, _rx) = TokioNotificationScheduler::new();
        let timer_id = Uuid::new_v4();

        let mut request = due_now(timer_id);
        request.id = String::new();

        let err = scheduler.schedule(request).unwrap_err();
        assert!(matches!(err, NotificationError::Rejected(_)));
        assert!(scheduler.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_request_never_fires() {
        let (scheduler, mut rx) = TokioNotificationScheduler::new();
        let timer_id = Uuid::new_v4();

        let mut request = due_now(timer_id);
        request.fire_at = Utc::now() + Duration::seconds(30);
        scheduler.schedule(request).unwrap();
        assert_eq!(scheduler.pending_ids().len(), 1);

        scheduler.cancel_prefix(&timer_id.to_string(), &[]);

        assert!(scheduler.pending_ids().is_empty());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_prefix_spares_excluded_delivered_id() {
        let (scheduler, mut rx) = TokioNotificationScheduler::new();
        let timer_id = Uuid::new_v4();

        scheduler.schedule(due_now(timer_id)).unwrap();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv()).await;

        scheduler.cancel_prefix(&timer_id.to_string(), &[terminal_id(timer_id)]);

        assert_eq!(scheduler.delivered_ids(), vec![terminal_id(timer_id)]);
    }

    #[tokio::test]
    async fn test_cancel_all_clears_everything() {
        let (scheduler, _rx) = TokioNotificationScheduler::new();
        let timer_id = Uuid::new_v4();

        let mut request = due_now(timer_id);
        request.fire_at = Utc::now() + Duration::seconds(30);
        scheduler.schedule(request).unwrap();

        scheduler.cancel_all();

        assert!(scheduler.pending_ids().is_empty());
        assert!(scheduler.delivered_ids().is_empty());
    }

    #[tokio::test]
    async fn test_rearming_same_id_replaces_task() {
        let (scheduler, _rx) = TokioNotificationScheduler::new();
        let timer_id = Uuid::new_v4();

        let mut first = due_now(timer_id);
        first.fire_at = Utc::now() + Duration::seconds(30);
        scheduler.schedule(first).unwrap();

        let mut second = due_now(timer_id);
        second.fire_at = Utc::now() + Duration::seconds(60);
        scheduler.schedule(second).unwrap();

        assert_eq!(scheduler.pending_ids().len(), 1);
    }
}
