//! The change hub: owns the history buffer and the subscriber set, and drives
//! raw events through classification, enrichment and fan-out.

use crate::buffer::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use crate::classify::{Classifier, Decision, EnrichmentRequest, FeedFilter};
use crate::enrich::{ComparisonFetcher, EnrichmentGateway};
use crate::error::Result;
use crate::source::SourceHandle;
use crate::subscriptions::{SubscriberConfig, SubscriberHandle, SubscriberId, SubscriberRegistry};
use crate::types::{ChangeRecord, RawChangeEvent};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

/// Hub configuration.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Which raw events are in scope.
    pub filter: FeedFilter,

    /// Records kept for new subscribers.
    pub history_capacity: usize,

    /// Per-subscriber channel settings.
    pub subscriber: SubscriberConfig,

    /// Enrichment lookups allowed in flight at once.
    pub max_in_flight_enrichments: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            filter: FeedFilter::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            subscriber: SubscriberConfig::default(),
            max_in_flight_enrichments: 16,
        }
    }
}

/// Owns the feed state and serves it to subscribers.
///
/// All mutation of the history buffer happens in [`finalize`](Self::finalize),
/// which also broadcasts under the same lock. Subscribing takes that lock
/// too, so a subscriber sees each record exactly once: in its snapshot or as
/// a later broadcast.
pub struct ChangeHub {
    classifier: Classifier,
    gateway: EnrichmentGateway,
    history: Mutex<HistoryBuffer>,
    subscribers: Arc<SubscriberRegistry>,
    subscriber_config: SubscriberConfig,
    max_in_flight: usize,
}

impl ChangeHub {
    pub fn new(config: HubConfig, fetcher: Arc<dyn ComparisonFetcher>) -> Self {
        Self {
            classifier: Classifier::new(config.filter),
            gateway: EnrichmentGateway::new(fetcher),
            history: Mutex::new(HistoryBuffer::new(config.history_capacity)),
            subscribers: Arc::new(SubscriberRegistry::new()),
            subscriber_config: config.subscriber,
            max_in_flight: config.max_in_flight_enrichments.max(1),
        }
    }

    // --- Subscribers ---

    /// Register a new viewer. Its first batch is the current history.
    pub fn subscribe(&self) -> SubscriberHandle {
        let history = self.history.lock();
        self.subscribers
            .subscribe(history.snapshot(), self.subscriber_config.clone())
    }

    /// Remove a viewer. Idempotent.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.unsubscribe(id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.subscriber_count()
    }

    /// Disconnect every viewer, e.g. on shutdown.
    pub fn close_subscribers(&self) -> usize {
        self.subscribers.clear()
    }

    // --- History ---

    /// Current history, newest first.
    pub fn snapshot(&self) -> Vec<ChangeRecord> {
        self.history.lock().snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    // --- Event processing ---

    /// Pre-filter, then classify.
    pub fn triage(&self, event: &RawChangeEvent) -> Decision {
        if !self.classifier.filter().is_relevant(event) {
            trace!(site = %event.site, title = %event.title, "event out of scope");
            return Decision::Discard;
        }
        self.classifier.classify(event)
    }

    /// Push a record into history and broadcast it.
    fn finalize(&self, record: ChangeRecord) {
        let mut history = self.history.lock();
        history.push(record.clone());
        let delivered = self.subscribers.broadcast(&record);
        debug!(
            title = %record.title(),
            kind = ?record.kind(),
            delivered,
            "record finalized"
        );
    }

    async fn enrich(&self, request: EnrichmentRequest) -> Option<ChangeRecord> {
        let summary = self
            .gateway
            .enrich(request.old_revision, request.new_revision)
            .await?;
        request.into_record(summary)
    }

    /// Process one event to completion.
    ///
    /// Returns the finalized record, or `None` if the event was discarded or
    /// its enrichment produced nothing.
    pub async fn handle_event(&self, event: &RawChangeEvent) -> Option<ChangeRecord> {
        let record = match self.triage(event) {
            Decision::Discard => return None,
            Decision::Final(record) => record,
            Decision::NeedsEnrichment(request) => self.enrich(request).await?,
        };
        self.finalize(record.clone());
        Some(record)
    }

    /// Consume `source` until it ends or `shutdown` resolves.
    ///
    /// Events are triaged in arrival order. Enrichment lookups run
    /// concurrently within this task, up to the configured limit; while the
    /// limit is reached the source is not polled. Records finalize in
    /// completion order, so a new page can overtake an edit whose lookup is
    /// still pending. Source errors are logged and skipped.
    pub async fn run<S, F>(&self, source: S, shutdown: F)
    where
        S: Stream<Item = Result<RawChangeEvent>>,
        F: Future<Output = ()>,
    {
        tokio::pin!(source);
        tokio::pin!(shutdown);

        let mut pending: FuturesUnordered<BoxFuture<'_, Option<ChangeRecord>>> =
            FuturesUnordered::new();
        let mut source_done = false;

        info!("change hub running");
        loop {
            if source_done && pending.is_empty() {
                break;
            }
            let accepting = !source_done && pending.len() < self.max_in_flight;

            tokio::select! {
                _ = &mut shutdown => {
                    debug!(dropped = pending.len(), "change hub shutting down");
                    break;
                }
                Some(enriched) = pending.next(), if !pending.is_empty() => {
                    if let Some(record) = enriched {
                        self.finalize(record);
                    }
                }
                item = source.next(), if accepting => match item {
                    Some(Ok(event)) => match self.triage(&event) {
                        Decision::Discard => {}
                        Decision::Final(record) => self.finalize(record),
                        Decision::NeedsEnrichment(request) => {
                            pending.push(Box::pin(self.enrich(request)));
                        }
                    },
                    Some(Err(e)) => warn!(error = %e, "event source error"),
                    None => {
                        debug!("event source ended");
                        source_done = true;
                    }
                },
            }
        }
        info!("change hub stopped");
    }

    /// Spawn [`run`](Self::run) over `source` on the current runtime.
    ///
    /// The returned handle detaches the source; dropping it detaches too.
    pub fn attach<S>(self: &Arc<Self>, source: S) -> SourceHandle
    where
        S: Stream<Item = Result<RawChangeEvent>> + Send + 'static,
    {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let hub = Arc::clone(self);
        let task = tokio::spawn(async move {
            hub.run(source, async {
                let _ = stop_rx.await;
            })
            .await;
        });
        SourceHandle::new(stop_tx, task)
    }
}

impl std::fmt::Debug for ChangeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHub")
            .field("history_len", &self.history_len())
            .field("subscribers", &self.subscriber_count())
            .field("max_in_flight", &self.max_in_flight)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::types::{ChangeKind, ChangeType};
    use async_trait::async_trait;

    struct FixedDiff(&'static str);

    #[async_trait]
    impl ComparisonFetcher for FixedDiff {
        async fn fetch_comparison(&self, _old: u64, _new: u64) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl ComparisonFetcher for Failing {
        async fn fetch_comparison(&self, _old: u64, _new: u64) -> Result<String> {
            Err(FeedError::Source("unreachable".into()))
        }
    }

    fn hub(fetcher: Arc<dyn ComparisonFetcher>) -> ChangeHub {
        ChangeHub::new(HubConfig::default(), fetcher)
    }

    fn edit(title: &str) -> RawChangeEvent {
        RawChangeEvent::new("enwiki", 0, title, ChangeType::Edit).with_revisions(1, 2)
    }

    #[tokio::test]
    async fn test_handle_edit() {
        let hub = hub(Arc::new(FixedDiff("<ins>added</ins>")));
        let record = hub.handle_event(&edit("Page")).await.unwrap();

        assert_eq!(record.kind(), ChangeKind::Edited);
        assert_eq!(record.summary(), Some("<ins>added</ins>"));
        assert_eq!(hub.snapshot(), vec![record]);
    }

    #[tokio::test]
    async fn test_failed_enrichment_is_dropped() {
        let hub = hub(Arc::new(Failing));
        let mut viewer = hub.subscribe();
        viewer.try_recv().unwrap();

        assert!(hub.handle_event(&edit("Page")).await.is_none());
        assert_eq!(hub.history_len(), 0);
        assert!(viewer.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_prefilter_skips_foreign_site() {
        let hub = hub(Arc::new(FixedDiff("<ins>x</ins>")));
        let event = RawChangeEvent::new("dewiki", 0, "Seite", ChangeType::New);
        assert!(hub.handle_event(&event).await.is_none());
        assert_eq!(hub.history_len(), 0);
    }

    #[tokio::test]
    async fn test_history_capacity_applies() {
        let config = HubConfig {
            history_capacity: 2,
            ..Default::default()
        };
        let hub = ChangeHub::new(config, Arc::new(Failing));
        for title in ["a", "b", "c"] {
            let event = RawChangeEvent::new("enwiki", 0, title, ChangeType::New);
            hub.handle_event(&event).await.unwrap();
        }

        let titles: Vec<_> = hub.snapshot().into_iter().map(|r| r.title().to_string()).collect();
        assert_eq!(titles, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_run_drains_finite_source() {
        let hub = hub(Arc::new(FixedDiff("<del>gone</del>")));
        let events = vec![
            Ok(RawChangeEvent::new("enwiki", 0, "New", ChangeType::New)),
            Err(FeedError::Source("stream hiccup".into())),
            Ok(edit("Edited")),
        ];

        hub.run(futures::stream::iter(events), std::future::pending())
            .await;

        assert_eq!(hub.history_len(), 2);
        assert_eq!(hub.snapshot()[0].title(), "Edited");
    }

    #[test]
    fn test_zero_in_flight_limit_is_clamped() {
        let config = HubConfig {
            max_in_flight_enrichments: 0,
            ..Default::default()
        };
        let hub = ChangeHub::new(config, Arc::new(Failing));
        assert_eq!(hub.max_in_flight, 1);
    }
}
