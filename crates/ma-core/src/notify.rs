use ma_events::bus::{DispatchError, NotificationBus};
use ma_events::types::Notification;
use std::sync::Arc;

/// Receives notifications after a transition has committed. Implementations
/// must not block on delivery.
pub trait Notifier {
    fn notify(&self, notification: Notification) -> Result<(), DispatchError>;
}

impl Notifier for NotificationBus {
    fn notify(&self, notification: Notification) -> Result<(), DispatchError> {
        self.publish(notification)
    }
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: Notification) -> Result<(), DispatchError> {
        (**self).notify(notification)
    }
}
