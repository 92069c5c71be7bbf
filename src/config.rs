use std::net::SocketAddr;

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct PrometheusConfig {
    /// The URL of the Prometheus push gateway.
    pub url: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum MetricConfig {
    PrometheusPush(PrometheusConfig),
}

#[derive(Deserialize, Debug, Clone)]
pub struct FeedConfig {
    /// Items returned when a feed request does not ask for a limit.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Likers shown in the stacked-avatar preview.
    #[serde(default = "default_liker_preview")]
    pub liker_preview: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            liker_preview: default_liker_preview(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct NotifyConfig {
    /// Characters of body text carried in a notification.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Prefix of the deep links to community content.
    #[serde(default = "default_link_base")]
    pub link_base: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            link_base: default_link_base(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub listen_address: Option<SocketAddr>,
    /// The database URL, e.g. `sqlite://data/cohort.db`.
    pub db: String,
    #[serde(default)]
    pub test: bool,
    pub metrics: Option<MetricConfig>,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

const fn default_page_size() -> usize {
    50
}

const fn default_liker_preview() -> usize {
    3
}

const fn default_preview_chars() -> usize {
    100
}

fn default_link_base() -> String {
    "/community".to_owned()
}
