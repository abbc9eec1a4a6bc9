//! Runtime configuration.

use crate::buffer::{DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY};
use crate::classify::FeedFilter;
use crate::enrich::DEFAULT_COMPARE_API;
use crate::error::{FeedError, Result};
use crate::hub::HubConfig;
use crate::source::{DEFAULT_IDLE_TIMEOUT, DEFAULT_STREAM_URL};
use crate::subscriptions::SubscriberConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Default `User-Agent` for outbound requests.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "changefeed/",
    env!("CARGO_PKG_VERSION"),
    " (live recent-changes relay)"
);

/// Everything needed to run the feed service.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,

    /// Live raw event stream.
    pub stream_url: String,

    /// Revision comparison API.
    pub compare_api_url: String,

    /// Which raw events are in scope.
    pub filter: FeedFilter,

    /// Records kept for new viewers.
    /// Default: 100
    pub history_capacity: usize,

    /// Queued batches per viewer before it is dropped.
    /// Default: 256
    pub subscriber_buffer: usize,

    /// Enrichment lookups in flight at once.
    /// Default: 16
    pub max_in_flight_enrichments: usize,

    /// Wait before reconnecting to the event stream.
    /// Default: 3s
    pub reconnect_delay: Duration,

    /// Silence after which the event stream is reconnected.
    /// Default: 60s
    pub idle_timeout: Duration,

    /// `User-Agent` sent to both upstream services.
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            compare_api_url: DEFAULT_COMPARE_API.to_string(),
            filter: FeedFilter::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            subscriber_buffer: SubscriberConfig::default().buffer_size,
            max_in_flight_enrichments: 16,
            reconnect_delay: Duration::from_secs(3),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FeedConfig {
    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.subscriber_buffer == 0 {
            return Err(FeedError::InvalidConfig(
                "subscriber buffer must hold at least one batch".into(),
            ));
        }
        if self.max_in_flight_enrichments == 0 {
            return Err(FeedError::InvalidConfig(
                "at least one enrichment must be allowed in flight".into(),
            ));
        }
        if self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(FeedError::InvalidConfig(format!(
                "history capacity {} exceeds the maximum of {}",
                self.history_capacity, MAX_HISTORY_CAPACITY
            )));
        }
        if self.idle_timeout.is_zero() {
            return Err(FeedError::InvalidConfig(
                "stream idle timeout must be positive".into(),
            ));
        }
        if self.filter.site.is_empty() {
            return Err(FeedError::InvalidConfig("site must not be empty".into()));
        }
        for (name, url) in [
            ("stream URL", &self.stream_url),
            ("compare API URL", &self.compare_api_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(FeedError::InvalidConfig(format!(
                    "{} must be an http(s) URL: {}",
                    name, url
                )));
            }
        }
        Ok(())
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            filter: self.filter.clone(),
            history_capacity: self.history_capacity,
            subscriber: SubscriberConfig {
                buffer_size: self.subscriber_buffer,
            },
            max_in_flight_enrichments: self.max_in_flight_enrichments,
        }
    }

    /// HTTP client shared by the event source and the comparison fetcher.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .build()?)
    }
}
