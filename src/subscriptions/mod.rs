//! Live subscriber channels for the change feed.
//!
//! Every connected viewer gets its own bounded queue of record batches:
//! - the first batch is a snapshot of the history buffer
//! - each later batch holds exactly one newly finalized record
//!
//! Delivery never blocks the broadcaster. A subscriber whose queue is full
//! or whose receiver is gone is dropped from the registry.
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(SubscriberRegistry::new());
//! let mut handle = registry.subscribe(snapshot, SubscriberConfig::default());
//!
//! while let Some(batch) = handle.recv().await {
//!     for record in batch {
//!         println!("{}: {:?}", record.title(), record.summary());
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriberRegistry;
pub use types::{DropReason, FeedBatch, SubscriberConfig, SubscriberHandle, SubscriberId};
