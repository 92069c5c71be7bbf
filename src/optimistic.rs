//! Client-side optimistic state.
//!
//! A client applies a change locally, sends the request, and either keeps the
//! projection or puts back exactly what it had before.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::models::{ContentId, ContentItem, Engagement};

/// A change applied ahead of confirmation.
#[derive(Debug, Clone)]
pub struct Optimistic<T> {
    snapshot: T,
    projected: T,
}

impl<T: Clone> Optimistic<T> {
    /// Snapshots `current` and projects `change` onto a copy.
    pub fn apply(current: &T, change: impl FnOnce(&mut T)) -> Self {
        let mut projected = current.clone();
        change(&mut projected);
        Self {
            snapshot: current.clone(),
            projected,
        }
    }

    pub fn projected(&self) -> &T {
        &self.projected
    }

    /// The request succeeded.
    pub fn commit(self) -> T {
        self.projected
    }

    /// The request failed: the value as it was before `apply`.
    pub fn revert(self) -> T {
        self.snapshot
    }
}

/// The part of [`Engagement`] a viewer changes by tapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngagementView {
    pub like_count: i64,
    pub liked: bool,
    pub saved: bool,
}

impl From<&Engagement> for EngagementView {
    fn from(e: &Engagement) -> Self {
        Self {
            like_count: e.like_count,
            liked: e.liked,
            saved: e.saved,
        }
    }
}

impl EngagementView {
    pub fn toggle_like(&mut self) {
        self.liked = !self.liked;
        self.like_count = if self.liked {
            self.like_count + 1
        } else {
            (self.like_count - 1).max(0)
        };
    }

    pub fn toggle_save(&mut self) {
        self.saved = !self.saved;
    }
}

/// Identifier of a comment the server has not confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TempId(u64);

impl TempId {
    /// A process-unique temporary id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A comment reference that is either server-assigned or still local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum CommentRef {
    Confirmed(ContentId),
    Pending(TempId),
}

impl CommentRef {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn confirmed(&self) -> Option<ContentId> {
        match self {
            Self::Confirmed(id) => Some(*id),
            Self::Pending(_) => None,
        }
    }

    /// Replaces `temp` with the server id. Returns whether `self` was the
    /// pending reference for `temp`.
    pub fn reconcile(&mut self, temp: TempId, id: ContentId) -> bool {
        if *self == Self::Pending(temp) {
            *self = Self::Confirmed(id);
            true
        } else {
            false
        }
    }
}

/// The moderation queue as a moderator's screen holds it.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    items: VecDeque<ContentItem>,
}

impl PendingQueue {
    pub fn new(items: impl IntoIterator<Item = ContentItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: ContentId) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.iter()
    }

    /// Removes `id` ahead of the moderation request.
    pub fn take(&mut self, id: ContentId) -> Option<ContentItem> {
        let index = self.items.iter().position(|i| i.id == id)?;
        self.items.remove(index)
    }

    /// Puts a taken item back at the front after a failed request. An item
    /// already present (say, after a refresh) is not added twice.
    pub fn restore(&mut self, item: ContentItem) {
        if !self.contains(item.id) {
            self.items.push_front(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::{Attachments, ContentKind, Status};

    fn pending(body: &str) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            kind: ContentKind::Post,
            author_id: Uuid::new_v4(),
            parent_id: None,
            body: body.to_owned(),
            attachments: Attachments::default(),
            mentions: BTreeSet::new(),
            status: Status::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn revert_restores_the_snapshot() {
        let before = EngagementView {
            like_count: 4,
            liked: false,
            saved: true,
        };

        let change = Optimistic::apply(&before, EngagementView::toggle_like);
        assert_eq!(
            *change.projected(),
            EngagementView {
                like_count: 5,
                liked: true,
                saved: true,
            }
        );
        assert_eq!(change.revert(), before);

        let change = Optimistic::apply(&before, EngagementView::toggle_save);
        assert!(!change.commit().saved);
    }

    #[test]
    fn unlike_never_goes_negative() {
        let mut view = EngagementView {
            like_count: 0,
            liked: true,
            saved: false,
        };
        view.toggle_like();
        assert_eq!(view.like_count, 0);
        assert!(!view.liked);
    }

    #[test]
    fn reconcile_only_matches_its_temp_id() {
        let (a, b) = (TempId::next(), TempId::next());
        assert_ne!(a, b);

        let id = Uuid::new_v4();
        let mut r = CommentRef::Pending(a);
        assert!(!r.reconcile(b, id));
        assert!(r.is_pending());
        assert!(r.reconcile(a, id));
        assert_eq!(r.confirmed(), Some(id));
        assert!(!r.reconcile(a, Uuid::new_v4()));
        assert_eq!(r.confirmed(), Some(id));
    }

    #[test]
    fn restore_goes_to_front_once() {
        let (x, y, z) = (pending("x"), pending("y"), pending("z"));
        let mut queue = PendingQueue::new([x.clone(), y.clone(), z.clone()]);

        let taken = queue.take(y.id).expect("y is queued");
        assert_eq!(queue.len(), 2);
        assert!(queue.take(y.id).is_none());

        queue.restore(taken.clone());
        queue.restore(taken);
        let order: Vec<_> = queue.iter().map(|i| i.body.as_str()).collect();
        assert_eq!(order, ["y", "x", "z"]);
    }
}
