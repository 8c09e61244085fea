//! PostgreSQL-backed in-app notification inbox.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use discepto_application::NotificationService;
use discepto_core::{AppError, AppResult};
use discepto_domain::{Notification, NotificationId, NotificationKind, NotificationView, UserId};

/// Stores notifications in the recipient's inbox table.
#[derive(Clone)]
pub struct PostgresNotificationService {
    pool: PgPool,
}

impl PostgresNotificationService {
    /// Creates a service with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: i32,
    notif_type: String,
    title: String,
    text: String,
    action_url: String,
}

impl TryFrom<NotificationRow> for NotificationView {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationKind::from_storage(&row.notif_type).ok_or_else(|| {
            AppError::Internal(format!("unknown notification type '{}'", row.notif_type))
        })?;

        Ok(Self {
            id: NotificationId::new(row.id),
            notification: Notification {
                kind,
                title: row.title,
                text: row.text,
                action_url: row.action_url,
            },
        })
    }
}

#[async_trait]
impl NotificationService for PostgresNotificationService {
    async fn send(&self, notification: Notification, to_user: UserId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, notif_type, title, text, action_url)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(to_user.as_i32())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.text)
        .bind(&notification.action_url)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to store notification for user {to_user}: {error}"
            ))
        })?;

        Ok(())
    }

    async fn list(&self, user_id: UserId) -> AppResult<Vec<NotificationView>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, notif_type, title, text, action_url
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list notifications of user {user_id}: {error}"
            ))
        })?;

        rows.into_iter().map(NotificationView::try_from).collect()
    }

    async fn delete(&self, user_id: UserId, notification_id: NotificationId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id.as_i32())
            .bind(user_id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to delete notification {notification_id}: {error}"
                ))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "notification {notification_id}"
            )));
        }

        Ok(())
    }
}
