use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::AuthenticatedUser,
    models::{ContentId, ContentItem, ContentKind, Decision},
    AppState, Result, SharedCommunity,
};

#[derive(Deserialize)]
struct QueueParams {
    kind: Option<ContentKind>,
}

#[derive(Deserialize)]
struct ModerateInput {
    decision: Decision,
}

async fn queue(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
    Query(params): Query<QueueParams>,
) -> Result<Json<Vec<ContentItem>>> {
    Ok(Json(
        community.list_pending_queue(user.id(), params.kind).await?,
    ))
}

async fn moderate(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
    Path(id): Path<ContentId>,
    Json(input): Json<ModerateInput>,
) -> Result<Json<ContentItem>> {
    Ok(Json(
        community
            .moderate_content(id, input.decision, user.id())
            .await?,
    ))
}

pub(super) fn routes() -> Router<AppState> {
    // AG /api/moderation/queue
    // AP /api/moderation/{id}
    Router::new()
        .route("/moderation/queue", get(queue))
        .route("/moderation/{id}",  post(moderate))
}
