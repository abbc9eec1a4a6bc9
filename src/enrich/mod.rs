//! Diff enrichment for edit events.
//!
//! A [`ComparisonFetcher`] turns a revision pair into the rendered diff
//! markup; [`EnrichmentGateway`] wraps a fetcher, summarizes the markup and
//! swallows every failure so a bad lookup only drops its own event.

mod mediawiki;

pub use mediawiki::{MediaWikiFetcher, DEFAULT_COMPARE_API};

use crate::error::Result;
use crate::summary::summarize;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of rendered revision comparisons.
#[async_trait]
pub trait ComparisonFetcher: Send + Sync {
    /// Fetch the diff markup between two revisions.
    ///
    /// A response without a diff is an error, not an empty string.
    async fn fetch_comparison(&self, old_revision: u64, new_revision: u64) -> Result<String>;
}

/// Converts revision pairs into summaries, one attempt per call.
#[derive(Clone)]
pub struct EnrichmentGateway {
    fetcher: Arc<dyn ComparisonFetcher>,
}

impl EnrichmentGateway {
    pub fn new(fetcher: Arc<dyn ComparisonFetcher>) -> Self {
        Self { fetcher }
    }

    /// Summary of the change between two revisions.
    ///
    /// `None` if the lookup fails or the diff has no visible text change.
    pub async fn enrich(&self, old_revision: u64, new_revision: u64) -> Option<String> {
        match self.fetcher.fetch_comparison(old_revision, new_revision).await {
            Ok(markup) => {
                let summary = summarize(Some(&markup));
                if summary.is_none() {
                    debug!(old_revision, new_revision, "comparison has no textual change");
                }
                summary
            }
            Err(e) => {
                warn!(old_revision, new_revision, error = %e, "enrichment failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for EnrichmentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentGateway").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use parking_lot::Mutex;

    struct Scripted {
        response: Mutex<Option<Result<String>>>,
        calls: Mutex<Vec<(u64, u64)>>,
    }

    impl Scripted {
        fn new(response: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ComparisonFetcher for Scripted {
        async fn fetch_comparison(&self, old: u64, new: u64) -> Result<String> {
            self.calls.lock().push((old, new));
            self.response
                .lock()
                .take()
                .unwrap_or_else(|| Err(FeedError::Source("called twice".into())))
        }
    }

    #[tokio::test]
    async fn test_enrich_summarizes_markup() {
        let fetcher = Scripted::new(Ok("<del>old</del><ins>new</ins>".to_string()));
        let gateway = EnrichmentGateway::new(fetcher.clone());

        let summary = gateway.enrich(1, 2).await;
        assert_eq!(summary.as_deref(), Some("<del>old</del><br><ins>new</ins>"));
        assert_eq!(*fetcher.calls.lock(), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_enrich_without_change_is_none() {
        let fetcher = Scripted::new(Ok("<tr><td>same</td></tr>".to_string()));
        let gateway = EnrichmentGateway::new(fetcher);
        assert_eq!(gateway.enrich(1, 2).await, None);
    }

    #[tokio::test]
    async fn test_enrich_failure_is_none_and_not_retried() {
        let fetcher = Scripted::new(Err(FeedError::MissingComparison { old: 1, new: 2 }));
        let gateway = EnrichmentGateway::new(fetcher.clone());

        assert_eq!(gateway.enrich(1, 2).await, None);
        assert_eq!(fetcher.calls.lock().len(), 1);
    }
}
