//! Notification rows.

use anyhow::{anyhow, Context as _};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::Store;
use crate::db::util::retry_sqlite;
use crate::error::{EngineError, Result};
use crate::models::{Broadcast, NewNotification, Notification, NotificationId, UserId};

/// Rows per multi-row insert. Eight binds a row keeps a chunk under SQLite's
/// historical 999-parameter limit.
const BROADCAST_CHUNK: usize = 100;

const COLUMNS: &str = "id, recipient_id, kind, title, content, link, is_read, created_at, actor_id";

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    kind: String,
    title: String,
    content: String,
    link: Option<String>,
    is_read: bool,
    created_at: DateTime<Utc>,
    actor_id: Option<Uuid>,
}

impl NotificationRow {
    fn decode(self) -> Result<Notification> {
        Ok(Notification {
            id: self.id,
            recipient_id: self.recipient_id,
            kind: self
                .kind
                .parse()
                .map_err(|e| EngineError::Internal(anyhow!("corrupt notification kind: {e}")))?,
            title: self.title,
            content: self.content,
            link: self.link,
            is_read: self.is_read,
            created_at: self.created_at,
            actor_id: self.actor_id,
        })
    }
}

impl Store {
    #[tracing::instrument(skip_all, fields(recipient = %n.recipient_id, kind = %n.kind))]
    pub(crate) async fn insert_notification(&self, n: &NewNotification) -> Result<NotificationId> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO notification (id, recipient_id, kind, title, content, link, is_read, created_at, actor_id)
                VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(id)
        .bind(n.recipient_id)
        .bind(n.kind.as_str())
        .bind(&n.title)
        .bind(&n.content)
        .bind(&n.link)
        .bind(Utc::now())
        .bind(n.actor_id)
        .execute(&self.pool)
        .await
        .context("failed to insert notification")?;

        Ok(id)
    }

    /// Writes one row per profile except `b.exclude`, in a single
    /// transaction. Returns the number of rows written.
    #[tracing::instrument(skip_all, fields(kind = %b.kind, exclude = ?b.exclude))]
    pub(crate) async fn insert_broadcast(&self, b: &Broadcast) -> Result<u64> {
        let now = Utc::now();

        let written = retry_sqlite(|| async move {
            let mut tx = self.pool.begin().await?;

            let mut recipients = QueryBuilder::<Sqlite>::new("SELECT id FROM profile");
            if let Some(exclude) = b.exclude {
                recipients.push(" WHERE id <> ").push_bind(exclude);
            }
            let recipients: Vec<UserId> = recipients
                .build_query_scalar()
                .fetch_all(&mut *tx)
                .await?;

            let mut written = 0;
            for chunk in recipients.chunks(BROADCAST_CHUNK) {
                let mut insert = QueryBuilder::<Sqlite>::new(
                    "INSERT INTO notification (id, recipient_id, kind, title, content, link, is_read, created_at, actor_id) ",
                );
                insert.push_values(chunk, |mut row, recipient| {
                    row.push_bind(Uuid::new_v4())
                        .push_bind(*recipient)
                        .push_bind(b.kind.as_str())
                        .push_bind(b.title.as_str())
                        .push_bind(b.content.as_str())
                        .push_bind(b.link.as_deref())
                        .push("0")
                        .push_bind(now)
                        .push_bind(b.actor_id);
                });

                written += insert.build().execute(&mut *tx).await?.rows_affected();
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(written)
        })
        .await
        .context("failed to write broadcast")?;

        Ok(written)
    }

    /// A recipient's notifications, newest first.
    pub(crate) async fn list_notifications(
        &self,
        recipient: UserId,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM notification WHERE recipient_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?"
        );
        let rows: Vec<NotificationRow> = sqlx::query_as(&sql)
            .bind(recipient)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .context("failed to list notifications")?;

        rows.into_iter().map(NotificationRow::decode).collect()
    }

    pub(crate) async fn unread_count(&self, recipient: UserId) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification WHERE recipient_id = ? AND is_read = 0",
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await
        .context("failed to count unread notifications")?;

        Ok(count)
    }

    /// Marks one notification read. Scoped to `recipient`; returns the number
    /// of rows matched (0 or 1).
    pub(crate) async fn mark_read(&self, recipient: UserId, id: NotificationId) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notification SET is_read = 1 WHERE id = ? AND recipient_id = ?")
                .bind(id)
                .bind(recipient)
                .execute(&self.pool)
                .await
                .context("failed to mark notification read")?;

        Ok(result.rows_affected())
    }

    /// Marks every unread notification of `recipient` read. Returns how many
    /// changed.
    pub(crate) async fn mark_all_read(&self, recipient: UserId) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notification SET is_read = 1 WHERE recipient_id = ? AND is_read = 0")
                .bind(recipient)
                .execute(&self.pool)
                .await
                .context("failed to mark notifications read")?;

        Ok(result.rows_affected())
    }
}
