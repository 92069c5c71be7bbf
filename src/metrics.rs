//! Metric name constants.

use std::time::Duration;

use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config;

pub const POSTS_CREATED: &str = "cohort.content.posts"; // Counter.
pub const COMMENTS_CREATED: &str = "cohort.content.comments"; // Counter.

pub const MODERATION_APPROVED: &str = "cohort.moderation.approved"; // Counter.
pub const MODERATION_REJECTED: &str = "cohort.moderation.rejected"; // Counter.

pub const NOTIFY_SENT: &str = "cohort.notify.sent"; // Counter.
pub const NOTIFY_BROADCAST_ROWS: &str = "cohort.notify.broadcast_rows"; // Counter.
pub const NOTIFY_FAILED: &str = "cohort.notify.failed"; // Counter.

pub const ENGAGEMENT_TOGGLES: &str = "cohort.engagement.toggles"; // Counter.

/// Must be ran exactly once on startup. This will declare all of the instruments for `metrics`.
pub fn setup(config: Option<&config::MetricConfig>) -> anyhow::Result<()> {
    describe_counter!(POSTS_CREATED, "The count of posts submitted.");
    describe_counter!(COMMENTS_CREATED, "The count of comments submitted.");

    describe_counter!(
        MODERATION_APPROVED,
        "The count of pending items approved by a moderator."
    );
    describe_counter!(
        MODERATION_REJECTED,
        "The count of pending items rejected by a moderator."
    );

    describe_counter!(NOTIFY_SENT, "The count of targeted notifications written.");
    describe_counter!(
        NOTIFY_BROADCAST_ROWS,
        "The count of notification rows written by broadcasts."
    );
    describe_counter!(
        NOTIFY_FAILED,
        "The count of notification dispatches that failed and were dropped."
    );

    describe_counter!(ENGAGEMENT_TOGGLES, "The count of like and save toggles.");

    if let Some(config) = config {
        match config {
            config::MetricConfig::PrometheusPush(prometheus_config) => {
                PrometheusBuilder::new()
                    .with_push_gateway(
                        prometheus_config.url.clone(),
                        Duration::from_secs(10),
                        None,
                        None,
                    )
                    .context("failed to set up push gateway")?
                    .install()
                    .context("failed to install metrics exporter")?;
            }
        }
    }

    Ok(())
}
