use async_trait::async_trait;

use discepto_core::AppResult;
use discepto_domain::{Notification, NotificationId, NotificationView, UserId};

/// Notification sink consumed by scope handles.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Delivers a notification to a user.
    async fn send(&self, notification: Notification, to_user: UserId) -> AppResult<()>;

    /// Lists a user's notifications, newest first.
    async fn list(&self, user_id: UserId) -> AppResult<Vec<NotificationView>>;

    /// Deletes one of the user's notifications.
    async fn delete(&self, user_id: UserId, notification_id: NotificationId) -> AppResult<()>;
}
