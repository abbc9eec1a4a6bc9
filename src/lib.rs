//! # Change Feed
//!
//! Relays a live stream of wiki edit events to any number of browser
//! viewers, keeping a short history and annotating edits with what changed.
//!
//! ## Core Concepts
//!
//! - **Classification**: raw events are filtered to one site and namespace,
//!   then turned into a final record or an enrichment request
//! - **Enrichment**: edits are summarized from a revision comparison;
//!   failed or empty lookups drop the event
//! - **History**: the most recent records, newest first, bounded
//! - **Fan-out**: every viewer gets the history, then each new record, over
//!   its own bounded queue
//!
//! ## Example
//!
//! ```ignore
//! use changefeed::{ChangeHub, FeedConfig, MediaWikiFetcher, RecentChangeSource};
//!
//! let config = FeedConfig::default();
//! let client = config.http_client()?;
//! let fetcher = MediaWikiFetcher::with_client(client.clone(), &config.compare_api_url);
//! let hub = Arc::new(ChangeHub::new(config.hub_config(), Arc::new(fetcher)));
//!
//! // Start consuming the live stream
//! let source = RecentChangeSource::new(client, &config.stream_url, config.reconnect_delay);
//! let attached = hub.attach(source.into_stream());
//!
//! // Serve viewers
//! let app = changefeed::server::router(hub.clone());
//! ```

pub mod buffer;
pub mod classify;
pub mod config;
pub mod enrich;
pub mod error;
pub mod hub;
pub mod logging;
pub mod server;
pub mod source;
pub mod subscriptions;
pub mod summary;
pub mod types;

// Re-exports
pub use buffer::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY};
pub use classify::{Classifier, Decision, EnrichmentRequest, FeedFilter};
pub use config::FeedConfig;
pub use enrich::{ComparisonFetcher, EnrichmentGateway, MediaWikiFetcher};
pub use error::{FeedError, Result};
pub use hub::{ChangeHub, HubConfig};
pub use source::{RecentChangeSource, SourceHandle};
pub use subscriptions::{
    DropReason, FeedBatch, SubscriberConfig, SubscriberHandle, SubscriberId, SubscriberRegistry,
};
pub use summary::summarize;
pub use types::*;
