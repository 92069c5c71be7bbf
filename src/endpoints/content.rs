use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{AuthenticatedUser, Viewer},
    models::{ContentId, ContentItem, ContentKind, FeedItem, FeedQuery, NewComment, NewPost, UserId},
    AppState, Result, SharedCommunity,
};

#[derive(Serialize)]
struct Toggled {
    active: bool,
}

#[derive(Deserialize)]
struct ActivityParams {
    #[serde(default = "default_activity_kind")]
    kind: ContentKind,
}

const fn default_activity_kind() -> ContentKind {
    ContentKind::Post
}

async fn create_post(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
    Json(input): Json<NewPost>,
) -> Result<(StatusCode, Json<ContentItem>)> {
    let post = community.create_post(user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    Viewer(viewer): Viewer,
    State(community): State<SharedCommunity>,
    Path(id): Path<ContentId>,
) -> Result<Json<ContentItem>> {
    Ok(Json(community.get_content(viewer, id).await?))
}

async fn list_comments(
    Viewer(viewer): Viewer,
    State(community): State<SharedCommunity>,
    Path(id): Path<ContentId>,
) -> Result<Json<Vec<ContentItem>>> {
    Ok(Json(community.list_comments(viewer, id).await?))
}

async fn add_comment(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
    Path(id): Path<ContentId>,
    Json(input): Json<NewComment>,
) -> Result<(StatusCode, Json<ContentItem>)> {
    let comment = community.add_comment(user.id(), id, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn toggle_like(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
    Path(id): Path<ContentId>,
) -> Result<Json<Toggled>> {
    let active = community.toggle_like(user.id(), id).await?;
    Ok(Json(Toggled { active }))
}

async fn toggle_save(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
    Path(id): Path<ContentId>,
) -> Result<Json<Toggled>> {
    let active = community.toggle_save(user.id(), id).await?;
    Ok(Json(Toggled { active }))
}

async fn feed(
    Viewer(viewer): Viewer,
    State(community): State<SharedCommunity>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedItem>>> {
    Ok(Json(community.list_feed(viewer, query).await?))
}

async fn activity(
    Viewer(viewer): Viewer,
    State(community): State<SharedCommunity>,
    Path(author): Path<UserId>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<Vec<ContentItem>>> {
    Ok(Json(
        community
            .list_author_activity(viewer, author, params.kind)
            .await?,
    ))
}

pub(super) fn routes() -> Router<AppState> {
    // P /api/posts
    // G /api/posts/{id}
    // G /api/posts/{id}/comments
    // P /api/posts/{id}/comments
    // P /api/content/{id}/like
    // P /api/content/{id}/save
    // G /api/feed
    // G /api/users/{id}/activity
    Router::new()
        .route("/posts",                 post(create_post))
        .route("/posts/{id}",            get(get_post))
        .route("/posts/{id}/comments",   get(list_comments).post(add_comment))
        .route("/content/{id}/like",     post(toggle_like))
        .route("/content/{id}/save",     post(toggle_save))
        .route("/feed",                  get(feed))
        .route("/users/{id}/activity",   get(activity))
}
