//! Relevance filtering and classification of raw change events.

use crate::types::{format_timestamp, ChangeRecord, ChangeType, RawChangeEvent};

/// Which events are in scope for the feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedFilter {
    /// Site identifier events must come from.
    pub site: String,
    /// Content namespace events must belong to.
    pub namespace: i64,
    /// Titles containing this fragment are log pseudo-pages and are skipped.
    pub excluded_title: String,
}

impl Default for FeedFilter {
    fn default() -> Self {
        Self {
            site: "enwiki".to_string(),
            namespace: 0,
            excluded_title: "Page log".to_string(),
        }
    }
}

impl FeedFilter {
    /// Relevance pre-filter.
    pub fn is_relevant(&self, event: &RawChangeEvent) -> bool {
        event.site == self.site
            && event.namespace == Some(self.namespace)
            && event.change_type != ChangeType::Log
            && (self.excluded_title.is_empty() || !event.title.contains(&self.excluded_title))
    }
}

/// Outcome of classifying one raw event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Not worth showing.
    Discard,
    /// Ready as-is, no lookup needed.
    Final(ChangeRecord),
    /// An edit whose summary has to be fetched.
    NeedsEnrichment(EnrichmentRequest),
}

/// Everything needed to turn a fetched comparison into an `Edited` record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrichmentRequest {
    pub title: String,
    /// Display time, already formatted.
    pub timestamp: String,
    pub old_revision: u64,
    pub new_revision: u64,
}

impl EnrichmentRequest {
    /// Build the `Edited` record; `None` for a blank summary.
    pub fn into_record(self, summary: String) -> Option<ChangeRecord> {
        ChangeRecord::edited(self.title, self.timestamp, summary)
    }
}

/// Pure classifier over raw events.
#[derive(Clone, Debug, Default)]
pub struct Classifier {
    filter: FeedFilter,
}

impl Classifier {
    pub fn new(filter: FeedFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    /// Decide what to do with `event`.
    ///
    /// `new` wins over everything else, so a new page is never enriched even
    /// when it carries revision identifiers. An edit needs both revision
    /// identifiers to be enriched; without them it is discarded.
    pub fn classify(&self, event: &RawChangeEvent) -> Decision {
        if !self.filter.is_relevant(event) {
            return Decision::Discard;
        }

        match event.change_type {
            ChangeType::New => Decision::Final(ChangeRecord::new_page(
                event.title.clone(),
                format_timestamp(event.timestamp()),
            )),
            ChangeType::Delete => Decision::Final(ChangeRecord::deleted(
                event.title.clone(),
                format_timestamp(event.timestamp()),
            )),
            ChangeType::Edit => match event.revision_ids() {
                Some((old_revision, new_revision)) => {
                    Decision::NeedsEnrichment(EnrichmentRequest {
                        title: event.title.clone(),
                        timestamp: format_timestamp(event.timestamp()),
                        old_revision,
                        new_revision,
                    })
                }
                None => Decision::Discard,
            },
            ChangeType::Log | ChangeType::Other => Decision::Discard,
        }
    }
}
