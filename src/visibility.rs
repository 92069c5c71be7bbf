//! Who may see a piece of content.
//!
//! Every read path (feed, single fetch, comment listing, comment counting,
//! author activity) goes through [`is_visible`].

use crate::models::{ContentItem, Status, UserId};

/// Anything carrying a moderation status and an author.
pub trait Moderated {
    fn status(&self) -> Status;
    fn author_id(&self) -> UserId;
}

impl Moderated for ContentItem {
    fn status(&self) -> Status {
        self.status
    }

    fn author_id(&self) -> UserId {
        self.author_id
    }
}

/// Approved content is public; anything else is visible to its author only.
pub fn is_visible(item: &impl Moderated, viewer: Option<UserId>) -> bool {
    item.status() == Status::Approved || viewer == Some(item.author_id())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::StoredStatus;

    struct Row(Option<&'static str>, UserId);

    impl Moderated for Row {
        fn status(&self) -> Status {
            StoredStatus::decode(self.0)
                .expect("valid status")
                .collapse()
        }

        fn author_id(&self) -> UserId {
            self.1
        }
    }

    #[test]
    fn status_viewer_cross_product() {
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();

        for raw in [Some("pending"), Some("approved"), Some("rejected"), None] {
            let row = Row(raw, author);
            let public = matches!(raw, Some("approved") | None);

            assert!(is_visible(&row, Some(author)), "author must see {raw:?}");
            assert_eq!(is_visible(&row, Some(other)), public, "other on {raw:?}");
            assert_eq!(is_visible(&row, None), public, "anonymous on {raw:?}");
        }
    }
}
