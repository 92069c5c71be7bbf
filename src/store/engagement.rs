//! Like and save edges.

use std::collections::{HashMap, HashSet};

use anyhow::Context as _;
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::{push_id_list, Store, ID_CHUNK};
use crate::db::util::retry_sqlite;
use crate::error::{EngineError, Result};
use crate::models::{ContentId, UserId};

/// The two kinds of user → content edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeKind {
    Like,
    Save,
}

impl EdgeKind {
    const fn table(self) -> &'static str {
        match self {
            Self::Like => "content_like",
            Self::Save => "content_save",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct LikerRow {
    pub content_id: ContentId,
    pub user_id: UserId,
    pub avatar_url: Option<String>,
}

impl Store {
    /// Removes the edge if present, otherwise creates it. Returns whether the
    /// edge exists afterwards.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn toggle_edge(
        &self,
        kind: EdgeKind,
        user: UserId,
        content: ContentId,
    ) -> Result<bool> {
        let table = kind.table();
        let now = Utc::now();

        let state = retry_sqlite(|| async move {
            let mut tx = self.pool.begin().await?;

            let removed = sqlx::query(&format!(
                "DELETE FROM {table} WHERE user_id = ? AND content_id = ?"
            ))
            .bind(user)
            .bind(content)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if removed > 0 {
                tx.commit().await?;
                return Ok::<_, sqlx::Error>(Some(false));
            }

            // Inserting through a SELECT on `content` keeps unknown ids out
            // without a second round trip in the common case.
            let inserted = sqlx::query(&format!(
                r#"
                INSERT INTO {table} (user_id, content_id, created_at)
                    SELECT ?, id, ? FROM content WHERE id = ?
                    ON CONFLICT DO NOTHING
                "#
            ))
            .bind(user)
            .bind(now)
            .bind(content)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let state = if inserted > 0 {
                Some(true)
            } else {
                // Either the content is unknown or a concurrent toggle won
                // the insert, in which case the edge does exist.
                sqlx::query_scalar::<_, i64>("SELECT 1 FROM content WHERE id = ?")
                    .bind(content)
                    .fetch_optional(&mut *tx)
                    .await?
                    .map(|_| true)
            };

            tx.commit().await?;
            Ok::<_, sqlx::Error>(state)
        })
        .await
        .context("failed to toggle edge")?;

        state.ok_or_else(|| EngineError::not_found("content", content))
    }

    /// Like count per item. Items without likes are absent.
    pub(crate) async fn like_counts(&self, ids: &[ContentId]) -> Result<HashMap<ContentId, i64>> {
        let mut counts = HashMap::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "SELECT content_id, COUNT(*) FROM content_like WHERE content_id IN ",
            );
            push_id_list(&mut query, chunk);
            query.push(" GROUP BY content_id");

            let rows: Vec<(ContentId, i64)> = query
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .context("failed to count likes")?;
            counts.extend(rows);
        }

        Ok(counts)
    }

    /// Which of `ids` carry a `kind` edge from `viewer`.
    pub(crate) async fn viewer_edges(
        &self,
        kind: EdgeKind,
        viewer: UserId,
        ids: &[ContentId],
    ) -> Result<HashSet<ContentId>> {
        let mut edges = HashSet::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(format!(
                "SELECT content_id FROM {} WHERE user_id = ",
                kind.table()
            ));
            query.push_bind(viewer).push(" AND content_id IN ");
            push_id_list(&mut query, chunk);

            let rows: Vec<ContentId> = query
                .build_query_scalar()
                .fetch_all(&self.pool)
                .await
                .context("failed to fetch viewer edges")?;
            edges.extend(rows);
        }

        Ok(edges)
    }

    /// Up to `per_item` most recent likers of each item, grouped by item and
    /// most recent first within a group.
    pub(crate) async fn recent_likers(
        &self,
        ids: &[ContentId],
        per_item: usize,
    ) -> Result<Vec<LikerRow>> {
        if per_item == 0 {
            return Ok(Vec::new());
        }

        // Partitions never span chunks, so per-chunk results concatenate.
        let mut likers = Vec::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                r#"
                SELECT content_id, user_id, avatar_url FROM (
                    SELECT l.content_id, l.user_id, p.avatar_url,
                        ROW_NUMBER() OVER (
                            PARTITION BY l.content_id
                            ORDER BY l.created_at DESC, l.rowid DESC
                        ) AS rn
                    FROM content_like l
                    LEFT JOIN profile p ON p.id = l.user_id
                    WHERE l.content_id IN "#,
            );
            push_id_list(&mut query, chunk);
            query
                .push(") WHERE rn <= ")
                .push_bind(per_item as i64)
                .push(" ORDER BY content_id, rn");

            let rows = query
                .build_query_as::<LikerRow>()
                .fetch_all(&self.pool)
                .await
                .context("failed to fetch recent likers")?;
            likers.extend(rows);
        }

        Ok(likers)
    }

    /// Every content id `viewer` has a `kind` edge on.
    pub(crate) async fn edge_content_ids(
        &self,
        kind: EdgeKind,
        viewer: UserId,
    ) -> Result<Vec<ContentId>> {
        let ids = sqlx::query_scalar(&format!(
            "SELECT content_id FROM {} WHERE user_id = ?",
            kind.table()
        ))
        .bind(viewer)
        .fetch_all(&self.pool)
        .await
        .context("failed to list edges")?;

        Ok(ids)
    }
}
