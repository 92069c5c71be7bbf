//! JSON endpoints, mounted under `/api`.

use axum::Router;

use crate::AppState;

mod content;
mod moderation;
mod notifications;
mod profiles;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(content::routes())
        .merge(moderation::routes())
        .merge(notifications::routes())
        .merge(profiles::routes())
}
