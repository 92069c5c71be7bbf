//! Caller identity.
//!
//! Sessions belong to the account system. By the time a request gets here the
//! gateway in front of us has put the caller's id in `X-User-Id`.

use anyhow::anyhow;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use uuid::Uuid;

use crate::models::UserId;
use crate::Error;

/// Header carrying the caller's profile id.
pub const USER_ID_HEADER: &str = "x-user-id";

fn caller(parts: &Parts) -> Result<Option<UserId>, Error> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let id = value
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| {
            Error::with_status(
                StatusCode::BAD_REQUEST,
                anyhow!("malformed {USER_ID_HEADER} header"),
            )
        })?;
    Ok(Some(id))
}

/// The caller, if any. Anonymous requests see approved content only.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<UserId>);

/// A caller that must be identified.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

impl AuthenticatedUser {
    pub fn id(&self) -> UserId {
        self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller(parts).map(Self)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller(parts)?.map(Self).ok_or_else(|| {
            Error::with_status(StatusCode::UNAUTHORIZED, anyhow!("missing {USER_ID_HEADER} header"))
        })
    }
}
