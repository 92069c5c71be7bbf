//! Hooks for the account system and the course catalogue.

use axum::{
    extract::{Path, State},
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    models::{CourseEvent, Profile, Role, UserId},
    moderation::require_admin,
    AppState, Result, SharedCommunity,
};

#[derive(Deserialize)]
struct ProfileInput {
    username: String,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Serialize)]
struct Announced {
    notified: u64,
}

/// Called by the account system whenever a profile changes. Not exposed
/// through the public gateway.
async fn upsert_profile(
    State(community): State<SharedCommunity>,
    Path(id): Path<UserId>,
    Json(input): Json<ProfileInput>,
) -> Result<Json<Profile>> {
    let profile = Profile {
        id,
        username: input.username,
        role: input.role,
        full_name: input.full_name,
        avatar_url: input.avatar_url,
    };
    Ok(Json(community.upsert_profile(profile).await?))
}

async fn announce_course(
    user: AuthenticatedUser,
    State(community): State<SharedCommunity>,
    Json(mut event): Json<CourseEvent>,
) -> Result<Json<Announced>> {
    require_admin(community.store(), user.id()).await?;
    event.actor_id = event.actor_id.or(Some(user.id()));

    let notified = community.announce_course_update(event).await?;
    Ok(Json(Announced { notified }))
}

pub(super) fn routes() -> Router<AppState> {
    // U /api/profiles/{id}
    // AP /api/announcements/course
    Router::new()
        .route("/profiles/{id}",        put(upsert_profile))
        .route("/announcements/course", post(announce_course))
}
