//! Feed composition: restrict, filter by visibility, enrich, order.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::config::FeedConfig;
use crate::engagement::aggregate;
use crate::error::{EngineError, Result};
use crate::models::{
    AuthorSummary, ContentId, ContentItem, FeedFilter, FeedItem, FeedQuery, UserId,
};
use crate::store::{EdgeKind, Store};
use crate::visibility::is_visible;

/// Relative age label: minutes below an hour, hours below a day, then days.
pub fn time_ago(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = now.signed_duration_since(created).num_minutes().max(0);
    match minutes {
        m if m < 60 => format!("{m}m"),
        m if m < 60 * 24 => format!("{}h", m / 60),
        m => format!("{}d", m / (60 * 24)),
    }
}

fn newest_first(a: &ContentItem, b: &ContentItem) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

/// Sorts `items` for `filter`. Popular ranks by likes, then comments, then
/// recency; every other filter is newest first.
pub fn order(items: &mut [FeedItem], filter: FeedFilter) {
    match filter {
        FeedFilter::Popular => items.sort_by(|a, b| {
            b.engagement
                .like_count
                .cmp(&a.engagement.like_count)
                .then_with(|| b.engagement.comment_count.cmp(&a.engagement.comment_count))
                .then_with(|| newest_first(&a.item, &b.item))
        }),
        FeedFilter::Recent | FeedFilter::Liked | FeedFilter::Saved | FeedFilter::ForYou => {
            items.sort_by(|a, b| newest_first(&a.item, &b.item));
        }
    }
}

/// The post ids `filter` limits the feed to, or `None` for no restriction.
async fn restriction(
    store: &Store,
    viewer: Option<UserId>,
    filter: FeedFilter,
) -> Result<Option<Vec<ContentId>>> {
    let edges = |kind| async move {
        match viewer {
            Some(viewer) => store.edge_content_ids(kind, viewer).await,
            None => Ok(Vec::new()),
        }
    };

    Ok(match filter {
        FeedFilter::Recent | FeedFilter::Popular => None,
        FeedFilter::Liked => Some(edges(EdgeKind::Like).await?),
        FeedFilter::Saved => Some(edges(EdgeKind::Save).await?),
        FeedFilter::ForYou => {
            let viewer = viewer.ok_or_else(|| {
                EngineError::Validation("the for_you feed needs a signed-in viewer".to_owned())
            })?;
            let profile = store.profile(viewer).await?.ok_or_else(|| {
                EngineError::Validation(format!("viewer {viewer} has no profile"))
            })?;
            Some(store.posts_mentioning(&profile.username).await?)
        }
    })
}

/// Builds the feed `viewer` sees for `query`.
#[tracing::instrument(skip(store, config))]
pub(crate) async fn compose(
    store: &Store,
    config: &FeedConfig,
    viewer: Option<UserId>,
    query: FeedQuery,
) -> Result<Vec<FeedItem>> {
    let limit = query.limit.unwrap_or(config.page_size);
    let only = restriction(store, viewer, query.filter).await?;

    let mut posts: Vec<ContentItem> = store
        .list_posts(only.as_deref())
        .await?
        .into_iter()
        .filter(|post| is_visible(post, viewer))
        .collect();

    // Only popularity needs engagement to rank, so the rest can cut first.
    if query.filter != FeedFilter::Popular {
        posts.sort_by(newest_first);
        posts.truncate(limit);
    }

    let ids: Vec<ContentId> = posts.iter().map(|p| p.id).collect();
    let mut engagement = aggregate(store, &ids, viewer, config.liker_preview).await?;

    let author_ids: Vec<UserId> = posts
        .iter()
        .map(|p| p.author_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let authors: HashMap<UserId, AuthorSummary> = store
        .profiles_by_ids(&author_ids)
        .await?
        .iter()
        .map(|p| (p.id, AuthorSummary::from(p)))
        .collect();

    let now = Utc::now();
    let mut items: Vec<FeedItem> = posts
        .into_iter()
        .map(|item| FeedItem {
            author: authors.get(&item.author_id).cloned(),
            engagement: engagement.remove(&item.id).unwrap_or_default(),
            age: time_ago(item.created_at, now),
            item,
        })
        .collect();

    order(&mut items, query.filter);
    items.truncate(limit);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::models::{Attachments, ContentKind, Engagement, Status};

    fn feed_item(likes: i64, comments: i64, minutes_ago: i64) -> FeedItem {
        let created_at = Utc::now() - Duration::minutes(minutes_ago);
        FeedItem {
            item: ContentItem {
                id: Uuid::new_v4(),
                kind: ContentKind::Post,
                author_id: Uuid::new_v4(),
                parent_id: None,
                body: format!("{likes} likes, {comments} comments"),
                attachments: Attachments::default(),
                mentions: BTreeSet::new(),
                status: Status::Approved,
                created_at,
            },
            author: None,
            engagement: Engagement {
                like_count: likes,
                comment_count: comments,
                ..Engagement::default()
            },
            age: String::new(),
        }
    }

    fn bodies(items: &[FeedItem]) -> Vec<&str> {
        items.iter().map(|i| i.item.body.as_str()).collect()
    }

    #[test]
    fn popular_breaks_ties_on_comments() {
        let mut items = vec![feed_item(5, 2, 3), feed_item(5, 4, 2), feed_item(3, 10, 1)];
        order(&mut items, FeedFilter::Popular);
        assert_eq!(
            bodies(&items),
            ["5 likes, 4 comments", "5 likes, 2 comments", "3 likes, 10 comments"]
        );
    }

    #[test]
    fn popular_falls_back_to_recency() {
        let mut items = vec![feed_item(1, 1, 30), feed_item(1, 1, 5)];
        let newer = items[1].item.id;
        order(&mut items, FeedFilter::Popular);
        assert_eq!(items[0].item.id, newer);
    }

    #[test]
    fn other_filters_are_newest_first() {
        for filter in [
            FeedFilter::Recent,
            FeedFilter::Liked,
            FeedFilter::Saved,
            FeedFilter::ForYou,
        ] {
            let mut items = vec![feed_item(9, 9, 60), feed_item(0, 0, 1), feed_item(3, 0, 10)];
            order(&mut items, filter);
            assert_eq!(
                bodies(&items),
                ["0 likes, 0 comments", "3 likes, 0 comments", "9 likes, 9 comments"]
            );
        }
    }

    #[test]
    fn age_labels() {
        let now = Utc::now();
        assert_eq!(time_ago(now, now), "0m");
        assert_eq!(time_ago(now - Duration::minutes(59), now), "59m");
        assert_eq!(time_ago(now - Duration::minutes(61), now), "1h");
        assert_eq!(time_ago(now - Duration::hours(23), now), "23h");
        assert_eq!(time_ago(now - Duration::days(3), now), "3d");
        assert_eq!(time_ago(now + Duration::minutes(5), now), "0m");
    }
}
