//! Domain types shared by the engine, the store and the HTTP surface.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Identity of a profile.
pub type UserId = Uuid;
/// Identity of a post or comment.
pub type ContentId = Uuid;
/// Identity of a notification.
pub type NotificationId = Uuid;

/// Implements `as_str` / `FromStr` / `Display` for a fieldless enum that is
/// persisted as text.
macro_rules! text_enum {
    ($ty:ident, $what:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// The persisted (and serialized) spelling.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(EngineError::Validation(format!(
                        concat!("unknown ", $what, " {:?}"),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

text_enum!(Role, "role" { User => "user", Admin => "admin" });

/// A user profile, as owned by the external account system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The public face of a content author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    pub id: UserId,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
}

impl From<&Profile> for AuthorSummary {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id,
            username: p.username.clone(),
            full_name: p.full_name.clone(),
            avatar_url: p.avatar_url.clone(),
            is_admin: p.is_admin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Post,
    Comment,
}

text_enum!(ContentKind, "content kind" { Post => "post", Comment => "comment" });

/// Moderation status as the core sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Approved,
    Rejected,
}

text_enum!(Status, "status" {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Moderation status as it may appear in storage.
///
/// Rows written before moderation existed carry no status; they decode to
/// [`StoredStatus::LegacyApproved`] and are indistinguishable from
/// [`Status::Approved`] past the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredStatus {
    Pending,
    Approved,
    Rejected,
    LegacyApproved,
}

impl StoredStatus {
    pub fn decode(raw: Option<&str>) -> Result<Self, EngineError> {
        Ok(match raw {
            None => Self::LegacyApproved,
            Some(s) => match s.parse::<Status>()? {
                Status::Pending => Self::Pending,
                Status::Approved => Self::Approved,
                Status::Rejected => Self::Rejected,
            },
        })
    }

    pub const fn collapse(self) -> Status {
        match self {
            Self::Pending => Status::Pending,
            Self::Approved | Self::LegacyApproved => Status::Approved,
            Self::Rejected => Status::Rejected,
        }
    }
}

/// The outcome a moderator may choose for a pending item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub const fn status(self) -> Status {
        match self {
            Self::Approved => Status::Approved,
            Self::Rejected => Status::Rejected,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
    /// Media URLs, in display order.
    #[serde(default)]
    pub images: Vec<String>,
    /// File URLs, in display order.
    #[serde(default)]
    pub files: Vec<String>,
}

impl Attachments {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.files.is_empty()
    }
}

/// A post or a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub kind: ContentKind,
    pub author_id: UserId,
    /// The post a comment belongs to. Always `None` for posts.
    pub parent_id: Option<ContentId>,
    pub body: String,
    pub attachments: Attachments,
    /// Usernames mentioned in `body`, captured at creation.
    pub mentions: BTreeSet<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

/// Input for a new post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    /// Usernames the client already knows are mentioned (e.g. picked from a
    /// suggestion list). Merged with those found in `body`.
    #[serde(default)]
    pub mentions: Vec<String>,
}

/// Input for a new comment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewComment {
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Mention,
    Reply,
    SystemAlert,
    CourseUpdate,
    NewPost,
}

text_enum!(NotificationKind, "notification kind" {
    Mention => "mention",
    Reply => "reply",
    SystemAlert => "system_alert",
    CourseUpdate => "course_update",
    NewPost => "new_post",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    /// Who triggered the notification. `None` for system notifications.
    pub actor_id: Option<UserId>,
}

/// A notification addressed to exactly one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub actor_id: Option<UserId>,
}

/// A notification fanned out to every known profile except `exclude`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub actor_id: Option<UserId>,
    pub exclude: Option<UserId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseTarget {
    Course,
    Module,
    Lesson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseAction {
    Created,
    Updated,
}

/// A course, module or lesson was saved by the course catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourseEvent {
    pub target: CourseTarget,
    pub action: CourseAction,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub actor_id: Option<UserId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedFilter {
    #[default]
    Recent,
    Popular,
    Liked,
    Saved,
    ForYou,
}

text_enum!(FeedFilter, "feed filter" {
    Recent => "recent",
    Popular => "popular",
    Liked => "liked",
    Saved => "saved",
    ForYou => "for_you",
});

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub filter: FeedFilter,
    /// Maximum number of items; the configured page size when absent.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl From<FeedFilter> for FeedQuery {
    fn from(filter: FeedFilter) -> Self {
        Self {
            filter,
            limit: None,
        }
    }
}

/// Someone who liked an item, for the stacked-avatar preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikerPreview {
    pub user_id: UserId,
    pub avatar_url: Option<String>,
}

/// Per-item engagement, relative to one viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Engagement {
    pub like_count: i64,
    pub liked: bool,
    pub saved: bool,
    pub comment_count: i64,
    /// Most recent likers first.
    pub recent_likers: Vec<LikerPreview>,
}

/// A feed entry: the post plus everything the feed card renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub item: ContentItem,
    pub author: Option<AuthorSummary>,
    pub engagement: Engagement,
    /// Relative age such as `5m`, `3h` or `2d`.
    pub age: String,
}
