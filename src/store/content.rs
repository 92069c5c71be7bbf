//! Posts and comments.

use anyhow::{anyhow, Context as _};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::{push_id_list, Store, ID_CHUNK};
use crate::error::{EngineError, Result};
use crate::models::{Attachments, ContentId, ContentItem, ContentKind, Status, StoredStatus, UserId};
use crate::visibility::Moderated;

const COLUMNS: &str = "id, kind, author_id, parent_id, body, images, files, mentions, status, created_at";

#[derive(FromRow)]
struct ContentRow {
    id: Uuid,
    kind: String,
    author_id: Uuid,
    parent_id: Option<Uuid>,
    body: String,
    images: Json<Vec<String>>,
    files: Json<Vec<String>>,
    mentions: Json<Vec<String>>,
    status: Option<String>,
    created_at: DateTime<Utc>,
}

fn decode_status(raw: Option<&str>) -> Result<Status> {
    StoredStatus::decode(raw)
        .map(StoredStatus::collapse)
        .map_err(|e| EngineError::Internal(anyhow!("corrupt status column: {e}")))
}

impl ContentRow {
    fn decode(self) -> Result<ContentItem> {
        let row = self;
        let kind = row
            .kind
            .parse()
            .map_err(|e| EngineError::Internal(anyhow!("corrupt kind column: {e}")))?;

        Ok(ContentItem {
            id: row.id,
            kind,
            author_id: row.author_id,
            parent_id: row.parent_id,
            body: row.body,
            attachments: Attachments {
                images: row.images.0,
                files: row.files.0,
            },
            mentions: row.mentions.0.into_iter().collect(),
            status: decode_status(row.status.as_deref())?,
            created_at: row.created_at,
        })
    }
}

fn decode_all(rows: Vec<ContentRow>) -> Result<Vec<ContentItem>> {
    rows.into_iter().map(ContentRow::decode).collect()
}

/// Just enough of a comment to count it under the visibility policy.
#[derive(Debug, Clone)]
pub(crate) struct CommentStub {
    pub parent_id: ContentId,
    pub author_id: UserId,
    pub status: Status,
}

impl Moderated for CommentStub {
    fn status(&self) -> Status {
        self.status
    }

    fn author_id(&self) -> UserId {
        self.author_id
    }
}

impl Store {
    /// Insert a new post or comment.
    #[tracing::instrument(skip_all, fields(id = %item.id, kind = %item.kind))]
    pub(crate) async fn insert_content(&self, item: &ContentItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO content (id, kind, author_id, parent_id, body, images, files, mentions, status, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id)
        .bind(item.kind.as_str())
        .bind(item.author_id)
        .bind(item.parent_id)
        .bind(&item.body)
        .bind(Json(&item.attachments.images))
        .bind(Json(&item.attachments.files))
        .bind(Json(&item.mentions))
        .bind(item.status.as_str())
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .context("failed to insert content")?;

        Ok(())
    }

    pub(crate) async fn get_content(&self, id: ContentId) -> Result<Option<ContentItem>> {
        let sql = format!("SELECT {COLUMNS} FROM content WHERE id = ?");
        let row: Option<ContentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch content")?;

        row.map(ContentRow::decode).transpose()
    }

    pub(crate) async fn content_exists(&self, id: ContentId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM content WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to check content existence")?;

        Ok(found.is_some())
    }

    /// Posts, newest first, optionally restricted to `only`.
    #[tracing::instrument(skip_all, fields(restricted = only.map(|ids| ids.len())))]
    pub(crate) async fn list_posts(&self, only: Option<&[ContentId]>) -> Result<Vec<ContentItem>> {
        let Some(ids) = only else {
            let sql =
                format!("SELECT {COLUMNS} FROM content WHERE kind = 'post' ORDER BY created_at DESC");
            let rows = sqlx::query_as(&sql)
                .fetch_all(&self.pool)
                .await
                .context("failed to list posts")?;
            return decode_all(rows);
        };

        let mut rows: Vec<ContentRow> = Vec::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(format!(
                "SELECT {COLUMNS} FROM content WHERE kind = 'post' AND id IN "
            ));
            push_id_list(&mut query, chunk);

            rows.extend(
                query
                    .build_query_as::<ContentRow>()
                    .fetch_all(&self.pool)
                    .await
                    .context("failed to list posts")?,
            );
        }
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        decode_all(rows)
    }

    /// Comments on `post`, oldest first.
    pub(crate) async fn list_comments(&self, post: ContentId) -> Result<Vec<ContentItem>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM content WHERE kind = 'comment' AND parent_id = ? ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as(&sql)
            .bind(post)
            .fetch_all(&self.pool)
            .await
            .context("failed to list comments")?;

        decode_all(rows)
    }

    /// Everything awaiting moderation, oldest first.
    pub(crate) async fn list_pending(&self, kind: Option<ContentKind>) -> Result<Vec<ContentItem>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {COLUMNS} FROM content WHERE status = 'pending'"
        ));
        if let Some(kind) = kind {
            query.push(" AND kind = ").push_bind(kind.as_str());
        }
        query.push(" ORDER BY created_at ASC");

        let rows = query
            .build_query_as::<ContentRow>()
            .fetch_all(&self.pool)
            .await
            .context("failed to list pending content")?;

        decode_all(rows)
    }

    /// An author's posts or comments, newest first.
    pub(crate) async fn list_by_author(
        &self,
        author: UserId,
        kind: ContentKind,
    ) -> Result<Vec<ContentItem>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM content WHERE author_id = ? AND kind = ? ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as(&sql)
            .bind(author)
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await
            .context("failed to list author content")?;

        decode_all(rows)
    }

    /// Ids of posts whose mention set contains exactly `username`.
    pub(crate) async fn posts_mentioning(&self, username: &str) -> Result<Vec<ContentId>> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT c.id FROM content c
                WHERE c.kind = 'post'
                AND EXISTS (SELECT 1 FROM json_each(c.mentions) m WHERE m.value = ?)
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .context("failed to look up mentions")?;

        Ok(ids)
    }

    /// Moves a pending item to `to`. Returns `None` when no pending row
    /// matched, i.e. the id is unknown or was already moderated.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn transition(&self, id: ContentId, to: Status) -> Result<Option<ContentItem>> {
        let sql = format!(
            "UPDATE content SET status = ? WHERE id = ? AND status = 'pending' RETURNING {COLUMNS}"
        );
        let row: Option<ContentRow> = sqlx::query_as(&sql)
            .bind(to.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to update content status")?;

        row.map(ContentRow::decode).transpose()
    }

    /// Comments under any of `posts`.
    pub(crate) async fn comment_stubs(&self, posts: &[ContentId]) -> Result<Vec<CommentStub>> {
        let mut rows: Vec<(Uuid, Uuid, Option<String>)> = Vec::new();
        for chunk in posts.chunks(ID_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "SELECT parent_id, author_id, status FROM content WHERE kind = 'comment' AND parent_id IN ",
            );
            push_id_list(&mut query, chunk);

            rows.extend(
                query
                    .build_query_as::<(Uuid, Uuid, Option<String>)>()
                    .fetch_all(&self.pool)
                    .await
                    .context("failed to fetch comments")?,
            );
        }

        rows.into_iter()
            .map(|(parent_id, author_id, status)| {
                Ok(CommentStub {
                    parent_id,
                    author_id,
                    status: decode_status(status.as_deref())?,
                })
            })
            .collect()
    }
}
