//! Inbound raw change events.
//!
//! - [`RecentChangeSource`] follows a live `recentchange` stream, reconnecting
//!   after failures or silence and resuming from the last seen event ID
//! - [`SourceHandle`] detaches a source that was attached to a hub

mod handle;
mod recentchange;

pub use handle::SourceHandle;
pub use recentchange::{
    RecentChangeSource, DEFAULT_IDLE_TIMEOUT, DEFAULT_STREAM_URL, MAX_LINE_BYTES,
};
