//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use changefeed::{
    ChangeHub, ChangeType, ComparisonFetcher, FeedError, HubConfig, RawChangeEvent, Result,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub const T: &str = "2024-01-15T13:05:09Z";

/// Comparison fetcher answering from a script.
///
/// Unknown revision pairs fail. A gated pair waits until its gate is
/// notified before answering.
#[derive(Default)]
pub struct ScriptedFetcher {
    diffs: Mutex<HashMap<(u64, u64), String>>,
    gates: Mutex<HashMap<(u64, u64), Arc<Notify>>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn diff(&self, old: u64, new: u64, markup: &str) {
        self.diffs.lock().insert((old, new), markup.to_string());
    }

    pub fn gate(&self, old: u64, new: u64) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert((old, new), gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComparisonFetcher for ScriptedFetcher {
    async fn fetch_comparison(&self, old: u64, new: u64) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().get(&(old, new)).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let diff = self.diffs.lock().get(&(old, new)).cloned();
        diff.ok_or(FeedError::MissingComparison { old, new })
    }
}

pub fn hub_with(fetcher: Arc<ScriptedFetcher>, config: HubConfig) -> Arc<ChangeHub> {
    Arc::new(ChangeHub::new(config, fetcher))
}

pub fn hub(fetcher: Arc<ScriptedFetcher>) -> Arc<ChangeHub> {
    hub_with(fetcher, HubConfig::default())
}

pub fn new_page(title: &str) -> RawChangeEvent {
    RawChangeEvent::new("enwiki", 0, title, ChangeType::New).with_timestamp(T)
}

pub fn deletion(title: &str) -> RawChangeEvent {
    RawChangeEvent::new("enwiki", 0, title, ChangeType::Delete).with_timestamp(T)
}

pub fn edit(title: &str, old: u64, new: u64) -> RawChangeEvent {
    RawChangeEvent::new("enwiki", 0, title, ChangeType::Edit)
        .with_timestamp(T)
        .with_revisions(old, new)
}
