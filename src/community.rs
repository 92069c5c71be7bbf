//! The engine's public operations.

use std::collections::BTreeSet;

use chrono::Utc;
use futures::future::join_all;
use metrics::counter;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{FeedConfig, NotifyConfig};
use crate::dispatch::{broadcast_best_effort, notify_best_effort, Dispatch, SqliteDispatcher};
use crate::error::{EngineError, Result};
use crate::mention::{self, extract_mentions, is_username};
use crate::metrics::{
    COMMENTS_CREATED, ENGAGEMENT_TOGGLES, MODERATION_APPROVED, MODERATION_REJECTED, NOTIFY_FAILED,
    POSTS_CREATED,
};
use crate::models::{
    Attachments, ContentId, ContentItem, ContentKind, CourseEvent, Decision, FeedItem, FeedQuery,
    NewComment, NewPost, Notification, NotificationId, Profile, Status, UserId,
};
use crate::store::{EdgeKind, Store};
use crate::visibility::is_visible;
use crate::{feed, moderation, notice};

/// Notifications returned when the caller does not ask for a limit.
const DEFAULT_NOTIFICATION_LIMIT: usize = 50;

/// The community engine over a store and a notification sink.
#[derive(Debug, Clone)]
pub struct Community<D> {
    store: Store,
    dispatch: D,
    feed: FeedConfig,
    notify: NotifyConfig,
}

/// The engine as the server runs it.
pub type Engine = Community<SqliteDispatcher>;

impl Engine {
    /// An engine that writes notifications into `store`.
    pub fn sqlite(store: Store, feed: FeedConfig, notify: NotifyConfig) -> Self {
        let dispatch = SqliteDispatcher::new(store.clone());
        Community::new(store, dispatch, feed, notify)
    }
}

fn validate_mention(raw: &str) -> Result<String> {
    let name = raw.trim();
    let name = name.strip_prefix('@').unwrap_or(name);
    if is_username(name) {
        Ok(name.to_owned())
    } else {
        Err(EngineError::Validation(format!("invalid mention {raw:?}")))
    }
}

impl<D: Dispatch> Community<D> {
    pub fn new(store: Store, dispatch: D, feed: FeedConfig, notify: NotifyConfig) -> Self {
        Self {
            store,
            dispatch,
            feed,
            notify,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    async fn require_profile(&self, id: UserId) -> Result<Profile> {
        self.store
            .profile(id)
            .await?
            .ok_or_else(|| EngineError::not_found("profile", id))
    }

    /// Fetches `id` if `viewer` may see it.
    async fn visible_content(&self, viewer: Option<UserId>, id: ContentId) -> Result<ContentItem> {
        self.store
            .get_content(id)
            .await?
            .filter(|item| is_visible(item, viewer))
            .ok_or_else(|| EngineError::not_found("content", id))
    }

    /// Sends a mention notification to everyone `item` mentions, except
    /// `skip`.
    async fn notify_mentions(&self, item: &ContentItem, author: &Profile, skip: Option<UserId>) {
        let recipients = match mention::resolve(&self.store, &item.mentions, author.id).await {
            Ok(recipients) => recipients,
            Err(e) => {
                counter!(NOTIFY_FAILED).increment(1);
                warn!(content = %item.id, "failed to resolve mentions: {e}");
                return;
            }
        };

        join_all(
            recipients
                .iter()
                .filter(|r| Some(r.id) != skip)
                .map(|r| {
                    notify_best_effort(
                        &self.dispatch,
                        notice::mention(&self.notify, item, author, r.id),
                    )
                }),
        )
        .await;
    }

    /// Creates a post. Admin posts are published (and announced) at once;
    /// everyone else's wait for moderation.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_post(&self, author: UserId, input: NewPost) -> Result<ContentItem> {
        let attachments = Attachments {
            images: input.images,
            files: input.files,
        };
        if input.body.trim().is_empty() && attachments.is_empty() {
            return Err(EngineError::Validation(
                "a post needs text or an attachment".to_owned(),
            ));
        }

        let supplied = input
            .mentions
            .iter()
            .map(|m| validate_mention(m))
            .collect::<Result<BTreeSet<_>>>()?;
        let profile = self.require_profile(author).await?;

        let mut mentions = extract_mentions(&input.body);
        mentions.extend(supplied);

        let item = ContentItem {
            id: Uuid::new_v4(),
            kind: ContentKind::Post,
            author_id: author,
            parent_id: None,
            body: input.body,
            attachments,
            mentions,
            status: moderation::initial_status(&profile),
            created_at: Utc::now(),
        };
        self.store.insert_content(&item).await?;

        counter!(POSTS_CREATED).increment(1);
        info!(id = %item.id, status = %item.status, "post created");

        self.notify_mentions(&item, &profile, None).await;
        if item.status == Status::Approved {
            broadcast_best_effort(&self.dispatch, notice::new_post(&self.notify, &item, &profile))
                .await;
        }

        Ok(item)
    }

    /// Adds a comment to a post the commenter can see. Comments are
    /// moderated like posts but never announced.
    #[tracing::instrument(skip(self, input))]
    pub async fn add_comment(
        &self,
        author: UserId,
        post_id: ContentId,
        input: NewComment,
    ) -> Result<ContentItem> {
        let body = input.body.trim();
        if body.is_empty() {
            return Err(EngineError::Validation("a comment needs text".to_owned()));
        }

        let profile = self.require_profile(author).await?;
        let post = self.visible_content(Some(author), post_id).await?;
        if post.kind != ContentKind::Post {
            return Err(EngineError::not_found("post", post_id));
        }

        let item = ContentItem {
            id: Uuid::new_v4(),
            kind: ContentKind::Comment,
            author_id: author,
            parent_id: Some(post.id),
            body: body.to_owned(),
            attachments: Attachments::default(),
            mentions: extract_mentions(body),
            status: moderation::initial_status(&profile),
            created_at: Utc::now(),
        };
        self.store.insert_content(&item).await?;

        counter!(COMMENTS_CREATED).increment(1);
        info!(id = %item.id, post = %post.id, status = %item.status, "comment created");

        // The post author hears about the comment once, as a reply.
        let replied_to = (post.author_id != author).then_some(post.author_id);
        self.notify_mentions(&item, &profile, replied_to).await;
        if let Some(post_author) = replied_to {
            notify_best_effort(
                &self.dispatch,
                notice::reply(&self.notify, &item, &profile, post_author),
            )
            .await;
        }

        Ok(item)
    }

    /// Approves or rejects a pending item. Approving a post announces it on
    /// behalf of its author.
    #[tracing::instrument(skip(self))]
    pub async fn moderate_content(
        &self,
        id: ContentId,
        decision: Decision,
        moderator: UserId,
    ) -> Result<ContentItem> {
        moderation::require_admin(&self.store, moderator).await?;
        let item = moderation::apply(&self.store, id, decision).await?;

        match decision {
            Decision::Approved => counter!(MODERATION_APPROVED).increment(1),
            Decision::Rejected => counter!(MODERATION_REJECTED).increment(1),
        }
        info!(%id, %moderator, status = %item.status, "content moderated");

        if decision == Decision::Approved && item.kind == ContentKind::Post {
            match self.store.profile(item.author_id).await {
                Ok(Some(author)) => {
                    broadcast_best_effort(
                        &self.dispatch,
                        notice::new_post(&self.notify, &item, &author),
                    )
                    .await;
                }
                Ok(None) => {
                    warn!(%id, author = %item.author_id, "author has no profile; not announcing");
                }
                Err(e) => {
                    counter!(NOTIFY_FAILED).increment(1);
                    warn!(%id, "failed to load author for announcement: {e}");
                }
            }
        }

        Ok(item)
    }

    async fn toggle(&self, kind: EdgeKind, user: UserId, id: ContentId) -> Result<bool> {
        self.visible_content(Some(user), id).await?;
        let state = self.store.toggle_edge(kind, user, id).await?;

        let label = match kind {
            EdgeKind::Like => "like",
            EdgeKind::Save => "save",
        };
        counter!(ENGAGEMENT_TOGGLES, "kind" => label).increment(1);
        Ok(state)
    }

    /// Likes or unlikes `id`. Returns whether `user` now likes it.
    pub async fn toggle_like(&self, user: UserId, id: ContentId) -> Result<bool> {
        self.toggle(EdgeKind::Like, user, id).await
    }

    /// Saves or unsaves `id`. Returns whether `user` now has it saved.
    pub async fn toggle_save(&self, user: UserId, id: ContentId) -> Result<bool> {
        self.toggle(EdgeKind::Save, user, id).await
    }

    pub async fn list_feed(
        &self,
        viewer: Option<UserId>,
        query: impl Into<FeedQuery>,
    ) -> Result<Vec<FeedItem>> {
        feed::compose(&self.store, &self.feed, viewer, query.into()).await
    }

    /// Items awaiting moderation, oldest first.
    pub async fn list_pending_queue(
        &self,
        moderator: UserId,
        kind: Option<ContentKind>,
    ) -> Result<Vec<ContentItem>> {
        moderation::require_admin(&self.store, moderator).await?;
        self.store.list_pending(kind).await
    }

    pub async fn get_content(&self, viewer: Option<UserId>, id: ContentId) -> Result<ContentItem> {
        self.visible_content(viewer, id).await
    }

    /// Comments on a post, oldest first, as `viewer` sees them.
    pub async fn list_comments(
        &self,
        viewer: Option<UserId>,
        post_id: ContentId,
    ) -> Result<Vec<ContentItem>> {
        let post = self.visible_content(viewer, post_id).await?;
        if post.kind != ContentKind::Post {
            return Err(EngineError::not_found("post", post_id));
        }

        let mut comments = self.store.list_comments(post.id).await?;
        comments.retain(|c| is_visible(c, viewer));
        Ok(comments)
    }

    /// An author's posts or comments, newest first, as `viewer` sees them.
    pub async fn list_author_activity(
        &self,
        viewer: Option<UserId>,
        author: UserId,
        kind: ContentKind,
    ) -> Result<Vec<ContentItem>> {
        let mut items = self.store.list_by_author(author, kind).await?;
        items.retain(|i| is_visible(i, viewer));
        Ok(items)
    }

    /// A recipient's notifications, newest first.
    pub async fn list_notifications(
        &self,
        recipient: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<Notification>> {
        self.store
            .list_notifications(recipient, limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT))
            .await
    }

    pub async fn unread_count(&self, recipient: UserId) -> Result<i64> {
        self.store.unread_count(recipient).await
    }

    /// Marks one of `recipient`'s notifications read. Marking an already
    /// read notification succeeds.
    pub async fn mark_notification_read(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<()> {
        match self.store.mark_read(recipient, id).await? {
            0 => Err(EngineError::not_found("notification", id)),
            _ => Ok(()),
        }
    }

    /// Returns how many notifications changed.
    pub async fn mark_all_notifications_read(&self, recipient: UserId) -> Result<u64> {
        self.store.mark_all_read(recipient).await
    }

    /// Tells everyone about a course, module or lesson that was created or
    /// updated. Returns the number of notifications written, 0 if delivery
    /// failed.
    #[tracing::instrument(skip(self, event), fields(course = ?event.target, action = ?event.action))]
    pub async fn announce_course_update(&self, event: CourseEvent) -> Result<u64> {
        if event.title.trim().is_empty() {
            return Err(EngineError::Validation(
                "a course update needs a title".to_owned(),
            ));
        }

        let broadcast = notice::course_update(&self.notify, &event);
        let rows = broadcast_best_effort(&self.dispatch, broadcast).await;
        info!(rows, "course update announced");
        Ok(rows)
    }

    /// Creates or replaces a profile as the account system knows it.
    pub async fn upsert_profile(&self, profile: Profile) -> Result<Profile> {
        if !is_username(&profile.username) {
            return Err(EngineError::Validation(format!(
                "invalid username {:?}",
                profile.username
            )));
        }

        self.store.upsert_profile(&profile).await?;
        Ok(profile)
    }
}
