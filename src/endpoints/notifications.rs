use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::AuthenticatedUser,
    models::{Notification, NotificationId},
    AppState, Result, SharedCommunity,
};

#[derive(Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

async fn list(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(
        community.list_notifications(user.id(), params.limit).await?,
    ))
}

async fn unread(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
) -> Result<Json<Value>> {
    let count = community.unread_count(user.id()).await?;
    Ok(Json(json!({ "count": count })))
}

async fn mark_read(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
    Path(id): Path<NotificationId>,
) -> Result<StatusCode> {
    community.mark_notification_read(user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
) -> Result<Json<Value>> {
    let updated = community.mark_all_notifications_read(user.id()).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub(super) fn routes() -> Router<AppState> {
    // AG /api/notifications
    // AG /api/notifications/unread
    // AP /api/notifications/{id}/read
    // AP /api/notifications/read
    Router::new()
        .route("/notifications",           get(list))
        .route("/notifications/unread",    get(unread))
        .route("/notifications/{id}/read", post(mark_read))
        .route("/notifications/read",      post(mark_all_read))
}
