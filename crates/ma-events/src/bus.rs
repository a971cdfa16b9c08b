use crate::types::Notification;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no notification subscribers")]
    NoSubscribers,
    #[error("notification store failed: {message}")]
    Store { message: String },
}

#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Never blocks; a full channel drops the oldest entry for lagging receivers.
    pub fn publish(&self, notification: Notification) -> Result<(), DispatchError> {
        self.sender
            .send(notification)
            .map(|_| ())
            .map_err(|_| DispatchError::NoSubscribers)
    }
}
