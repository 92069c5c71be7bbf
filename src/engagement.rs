//! Per-item engagement for a batch of content, relative to one viewer.
//!
//! Each quantity is a single batched query over the whole id set.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::models::{ContentId, Engagement, LikerPreview, UserId};
use crate::store::{CommentStub, EdgeKind, LikerRow, Store};
use crate::visibility::is_visible;

/// Comments per post, counting only those `viewer` may see.
pub(crate) fn count_visible_comments(
    stubs: &[CommentStub],
    viewer: Option<UserId>,
) -> HashMap<ContentId, i64> {
    let mut counts = HashMap::new();
    for stub in stubs.iter().filter(|s| is_visible(*s, viewer)) {
        *counts.entry(stub.parent_id).or_insert(0) += 1;
    }
    counts
}

fn group_likers(rows: Vec<LikerRow>) -> HashMap<ContentId, Vec<LikerPreview>> {
    let mut grouped: HashMap<ContentId, Vec<LikerPreview>> = HashMap::new();
    for row in rows {
        grouped.entry(row.content_id).or_default().push(LikerPreview {
            user_id: row.user_id,
            avatar_url: row.avatar_url,
        });
    }
    grouped
}

/// Engagement for every id in `ids`; items nobody touched get the default.
#[tracing::instrument(skip(store, ids), fields(items = ids.len()))]
pub(crate) async fn aggregate(
    store: &Store,
    ids: &[ContentId],
    viewer: Option<UserId>,
    preview: usize,
) -> Result<HashMap<ContentId, Engagement>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let viewer_edges = |kind| async move {
        match viewer {
            Some(viewer) => store.viewer_edges(kind, viewer, ids).await,
            None => Ok(HashSet::new()),
        }
    };

    let (likes, liked, saved, stubs, likers) = tokio::try_join!(
        store.like_counts(ids),
        viewer_edges(EdgeKind::Like),
        viewer_edges(EdgeKind::Save),
        store.comment_stubs(ids),
        store.recent_likers(ids, preview),
    )?;

    let comments = count_visible_comments(&stubs, viewer);
    let mut likers = group_likers(likers);

    Ok(ids
        .iter()
        .map(|id| {
            let engagement = Engagement {
                like_count: likes.get(id).copied().unwrap_or(0),
                liked: liked.contains(id),
                saved: saved.contains(id),
                comment_count: comments.get(id).copied().unwrap_or(0),
                recent_likers: likers.remove(id).unwrap_or_default(),
            };
            (*id, engagement)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::Status;

    #[test]
    fn hidden_comments_are_not_counted() {
        let post = Uuid::new_v4();
        let me = Uuid::new_v4();
        let someone = Uuid::new_v4();
        let stub = |author_id, status| CommentStub {
            parent_id: post,
            author_id,
            status,
        };

        let stubs = vec![
            stub(someone, Status::Approved),
            stub(someone, Status::Pending),
            stub(someone, Status::Rejected),
            stub(me, Status::Pending),
        ];

        assert_eq!(count_visible_comments(&stubs, None).get(&post), Some(&1));
        assert_eq!(count_visible_comments(&stubs, Some(me)).get(&post), Some(&2));
        assert_eq!(count_visible_comments(&stubs, Some(someone)).get(&post), Some(&3));
    }

    #[test]
    fn likers_keep_query_order() {
        let a = Uuid::new_v4();
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![
            LikerRow {
                content_id: a,
                user_id: u1,
                avatar_url: Some("1.png".to_owned()),
            },
            LikerRow {
                content_id: a,
                user_id: u2,
                avatar_url: None,
            },
        ];

        let grouped = group_likers(rows);
        let users: Vec<_> = grouped[&a].iter().map(|l| l.user_id).collect();
        assert_eq!(users, vec![u1, u2]);
    }
}
