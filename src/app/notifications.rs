use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::app::mess_cut::Notifier;
use crate::domain::notification::Notification;
use crate::infra::db::Db;
use crate::infra::push::PushClient;

#[derive(Clone)]
pub struct NotificationService {
    db: Db,
    push: PushClient,
}

impl NotificationService {
    pub fn new(db: Db, push: PushClient) -> Self {
        Self { db, push }
    }

    async fn insert(
        &self,
        recipient: Uuid,
        title: &str,
        message: &str,
        payload: &Value,
    ) -> Result<()> {
        let notification_type = payload
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("system");

        sqlx::query(
            "INSERT INTO notifications (user_id, title, message, notification_type, payload) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(recipient)
        .bind(title)
        .bind(message)
        .bind(notification_type)
        .bind(payload)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Notification>> {
        let rows = match cursor {
            Some((created_at, notification_id)) => {
                sqlx::query(
                    "SELECT id, user_id, title, message, notification_type, payload, \
                            is_read, created_at \
                     FROM notifications \
                     WHERE user_id = $1 \
                       AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $4",
                )
                .bind(user_id)
                .bind(created_at)
                .bind(notification_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, user_id, title, message, notification_type, payload, \
                            is_read, created_at \
                     FROM notifications \
                     WHERE user_id = $1 \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $2",
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut notifications = Vec::with_capacity(rows.len());
        for row in rows {
            notifications.push(Notification {
                id: row.get("id"),
                user_id: row.get("user_id"),
                title: row.get("title"),
                message: row.get("message"),
                notification_type: row.get("notification_type"),
                payload: row.get("payload"),
                is_read: row.get("is_read"),
                created_at: row.get("created_at"),
            });
        }

        Ok(notifications)
    }

    /// Idempotent: re-marking an already-read notification is still a hit.
    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl Notifier for NotificationService {
    // Never blocks the caller's primary operation: either side effect may
    // fail and the failure stays here, as a warning in the log.
    async fn notify(&self, recipient: Uuid, title: &str, message: &str, payload: Value) {
        if let Err(err) = self.insert(recipient, title, message, &payload).await {
            warn!(error = ?err, %recipient, title, "failed to persist notification");
        }

        if let Err(err) = self.push.send(recipient, title, message, &payload).await {
            warn!(error = ?err, %recipient, title, "failed to dispatch push alert");
        }
    }
}
