//! Community moderation and notification fan-out engine.
mod auth;
pub mod community;
mod config;
mod db;
pub mod dispatch;
mod endpoints;
mod engagement;
pub mod error;
pub mod feed;
pub mod mention;
mod metrics;
pub mod models;
pub mod moderation;
pub mod notice;
pub mod optimistic;
mod serve;
pub mod store;
pub mod visibility;

pub use community::{Community, Engine};
pub use config::{AppConfig, FeedConfig, NotifyConfig};
pub use db::establish_pool;
pub use serve::{app, run, AppState, Args, Error, Result, SharedCommunity};

/// The index (/) route.
async fn index() -> impl axum::response::IntoResponse {
    r"
  ___ ___| |__   ___  _ __| |_
 / __/ _ \ '_ \ / _ \| '__| __|
| (_| (_) | | | | (_) | |  | |_
 \___\___/|_| |_|\___/|_|   \__|


This is the community engine of a social learning platform.

Most API routes are under /api/
    "
}
