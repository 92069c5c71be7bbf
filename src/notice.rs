//! Notification copy and deep links.

use crate::config::NotifyConfig;
use crate::mention::preview;
use crate::models::{
    Broadcast, ContentItem, ContentKind, CourseAction, CourseEvent, CourseTarget, NewNotification,
    NotificationKind, Profile, UserId,
};

/// The name shown for `profile` in notification titles.
pub fn display_name(profile: &Profile) -> &str {
    profile
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&profile.username)
}

/// Deep link to a post, or to a comment within its post.
pub fn link_to(base: &str, item: &ContentItem) -> String {
    match (item.kind, item.parent_id) {
        (ContentKind::Comment, Some(parent)) => format!("{base}/post/{parent}?comment={}", item.id),
        _ => format!("{base}/post/{}", item.id),
    }
}

fn snippet(cfg: &NotifyConfig, item: &ContentItem) -> String {
    if item.body.trim().is_empty() && !item.attachments.is_empty() {
        return "Shared an attachment".to_owned();
    }
    preview(&item.body, cfg.preview_chars)
}

pub fn mention(
    cfg: &NotifyConfig,
    item: &ContentItem,
    author: &Profile,
    recipient: UserId,
) -> NewNotification {
    let place = match item.kind {
        ContentKind::Post => "a post",
        ContentKind::Comment => "a comment",
    };

    NewNotification {
        recipient_id: recipient,
        kind: NotificationKind::Mention,
        title: format!("{} mentioned you in {place}", display_name(author)),
        content: snippet(cfg, item),
        link: Some(link_to(&cfg.link_base, item)),
        actor_id: Some(author.id),
    }
}

pub fn reply(
    cfg: &NotifyConfig,
    comment: &ContentItem,
    commenter: &Profile,
    post_author: UserId,
) -> NewNotification {
    NewNotification {
        recipient_id: post_author,
        kind: NotificationKind::Reply,
        title: format!("{} commented on your post", display_name(commenter)),
        content: snippet(cfg, comment),
        link: Some(link_to(&cfg.link_base, comment)),
        actor_id: Some(commenter.id),
    }
}

/// Announces an approved post to everyone but its author.
pub fn new_post(cfg: &NotifyConfig, post: &ContentItem, author: &Profile) -> Broadcast {
    Broadcast {
        kind: NotificationKind::NewPost,
        title: format!("New post from {}", display_name(author)),
        content: snippet(cfg, post),
        link: Some(link_to(&cfg.link_base, post)),
        actor_id: Some(author.id),
        exclude: Some(author.id),
    }
}

pub fn course_update(cfg: &NotifyConfig, event: &CourseEvent) -> Broadcast {
    let what = match event.target {
        CourseTarget::Course => "course",
        CourseTarget::Module => "module",
        CourseTarget::Lesson => "lesson",
    };
    let title = match event.action {
        CourseAction::Created => format!("New {what}: {}", event.title),
        CourseAction::Updated => format!("Updated {what}: {}", event.title),
    };

    Broadcast {
        kind: NotificationKind::CourseUpdate,
        title,
        content: preview(&event.summary, cfg.preview_chars),
        link: event.link.clone(),
        actor_id: event.actor_id,
        exclude: None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::{Attachments, Role, Status};

    fn item(kind: ContentKind, parent_id: Option<Uuid>, body: &str) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            kind,
            author_id: Uuid::new_v4(),
            parent_id,
            body: body.to_owned(),
            attachments: Attachments::default(),
            mentions: BTreeSet::new(),
            status: Status::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn links_point_at_the_post() {
        let post = item(ContentKind::Post, None, "hi");
        assert_eq!(link_to("/community", &post), format!("/community/post/{}", post.id));

        let comment = item(ContentKind::Comment, Some(post.id), "yo");
        assert_eq!(
            link_to("/c", &comment),
            format!("/c/post/{}?comment={}", post.id, comment.id)
        );
    }

    #[test]
    fn names_fall_back_to_username() {
        let mut p = Profile {
            id: Uuid::new_v4(),
            username: "ana".to_owned(),
            role: Role::User,
            full_name: Some("  ".to_owned()),
            avatar_url: None,
        };
        assert_eq!(display_name(&p), "ana");
        p.full_name = Some("Ana Lima".to_owned());
        assert_eq!(display_name(&p), "Ana Lima");
    }

    #[test]
    fn attachment_only_posts_get_a_snippet() {
        let mut post = item(ContentKind::Post, None, "");
        post.attachments.images.push("https://cdn/x.png".to_owned());
        assert_eq!(snippet(&NotifyConfig::default(), &post), "Shared an attachment");
    }
}
