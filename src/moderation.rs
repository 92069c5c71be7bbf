//! Moderation workflow: content enters as pending unless an admin wrote it,
//! and leaves pending exactly once.

use crate::error::{EngineError, Result};
use crate::models::{ContentId, ContentItem, Decision, Profile, Status, UserId};
use crate::store::Store;

/// The status a new item starts in. Admins bypass moderation.
pub fn initial_status(author: &Profile) -> Status {
    if author.is_admin() {
        Status::Approved
    } else {
        Status::Pending
    }
}

/// Loads `moderator` and checks they may moderate.
pub(crate) async fn require_admin(store: &Store, moderator: UserId) -> Result<Profile> {
    let profile = store
        .profile(moderator)
        .await?
        .ok_or_else(|| EngineError::not_found("profile", moderator))?;

    if !profile.is_admin() {
        return Err(EngineError::Forbidden(format!(
            "{} is not a moderator",
            profile.username
        )));
    }
    Ok(profile)
}

/// Applies `decision` to a pending item in one conditional update.
///
/// An item that exists but is no longer pending (including legacy rows,
/// which read as approved) is a conflict. Nothing is ever silently
/// re-moderated.
#[tracing::instrument(skip(store))]
pub(crate) async fn apply(store: &Store, id: ContentId, decision: Decision) -> Result<ContentItem> {
    match store.transition(id, decision.status()).await? {
        Some(item) => Ok(item),
        None if store.content_exists(id).await? => Err(EngineError::Conflict(format!(
            "content {id} has already been moderated"
        ))),
        None => Err(EngineError::not_found("content", id)),
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::Role;

    fn profile(role: Role) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            username: "someone".to_owned(),
            role,
            full_name: None,
            avatar_url: None,
        }
    }

    #[test]
    fn admins_skip_the_queue() {
        assert_eq!(initial_status(&profile(Role::Admin)), Status::Approved);
        assert_eq!(initial_status(&profile(Role::User)), Status::Pending);
    }
}
