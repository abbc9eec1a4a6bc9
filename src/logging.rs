//! Logging initialization.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Logging profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output, debug level.
    Development,
    /// JSON structured output, info level.
    Production,
}

static INIT_ONCE: Once = Once::new();

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the profile's default filter. Only the first call
/// has an effect; a subscriber installed elsewhere is left alone.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let _ = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(filter("changefeed=debug"))
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter("changefeed=info"))
                .try_init(),
        };
    });
}
