//! Failure paths: bad lookups, bad events and flaky sources.

mod common;

use changefeed::{ChangeType, FeedError, RawChangeEvent, Result};
use common::{edit, hub, new_page, ScriptedFetcher};
use futures::StreamExt;

#[tokio::test]
async fn test_failed_lookup_drops_only_its_event() {
    let fetcher = ScriptedFetcher::new();
    fetcher.diff(2, 3, "<ins>fine</ins>");
    let hub = hub(fetcher.clone());

    assert!(hub.handle_event(&edit("Broken", 1, 2)).await.is_none());
    assert!(hub.handle_event(&edit("Working", 2, 3)).await.is_some());

    let titles: Vec<_> = hub.snapshot().into_iter().map(|r| r.title().to_string()).collect();
    assert_eq!(titles, vec!["Working"]);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_whitespace_only_change_is_dropped() {
    let fetcher = ScriptedFetcher::new();
    fetcher.diff(1, 2, "<ins>   </ins><del>\n</del>");
    let hub = hub(fetcher);

    assert!(hub.handle_event(&edit("Spaces", 1, 2)).await.is_none());
    assert_eq!(hub.history_len(), 0);
}

#[tokio::test]
async fn test_unterminated_markup_is_tolerated() {
    let fetcher = ScriptedFetcher::new();
    fetcher.diff(1, 2, "<del>kept</del><ins>never closed");
    let hub = hub(fetcher);

    let record = hub.handle_event(&edit("Partial", 1, 2)).await.unwrap();
    assert_eq!(record.summary(), Some("<del>kept</del>"));
}

#[tokio::test]
async fn test_out_of_scope_events_are_ignored() {
    let fetcher = ScriptedFetcher::new();
    let hub = hub(fetcher.clone());

    let events = [
        RawChangeEvent::new("dewiki", 0, "Seite", ChangeType::New),
        RawChangeEvent::new("enwiki", 1, "Talk:Page", ChangeType::New),
        RawChangeEvent::new("enwiki", 0, "Special:Page log", ChangeType::Delete),
        RawChangeEvent::new("enwiki", 0, "Moved", ChangeType::Log),
        RawChangeEvent::new("enwiki", 0, "Categorized", ChangeType::Other).with_revisions(1, 2),
    ];
    for event in &events {
        assert!(hub.handle_event(event).await.is_none());
    }

    assert_eq!(hub.history_len(), 0);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_event_without_namespace_is_ignored() {
    let fetcher = ScriptedFetcher::new();
    let hub = hub(fetcher.clone());

    for raw in [
        r#"{"wiki":"enwiki","title":"User talk:X","type":"new","meta":{"dt":"2024-01-15T13:05:09Z"}}"#,
        r#"{"wiki":"enwiki","title":"User talk:Y","type":"edit","revision":{"old":1,"new":2}}"#,
    ] {
        let event: RawChangeEvent = serde_json::from_str(raw).unwrap();
        assert!(hub.handle_event(&event).await.is_none());
    }

    assert_eq!(hub.history_len(), 0);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_unusual_wire_events_decode() {
    let hub = hub(ScriptedFetcher::new());

    let categorize: RawChangeEvent = serde_json::from_str(
        r#"{"wiki":"enwiki","namespace":0,"title":"X","type":"categorize","meta":{"dt":"2024-01-15T13:05:09Z"}}"#,
    )
    .unwrap();
    assert_eq!(categorize.change_type, ChangeType::Other);
    assert!(hub.handle_event(&categorize).await.is_none());

    let created: RawChangeEvent =
        serde_json::from_str(r#"{"wiki":"enwiki","namespace":0,"title":"Y","type":"new"}"#).unwrap();
    let record = hub.handle_event(&created).await.unwrap();
    assert_eq!(record.timestamp(), "");
}

#[tokio::test]
async fn test_bad_timestamp_is_kept_verbatim() {
    let hub = hub(ScriptedFetcher::new());
    let event = RawChangeEvent::new("enwiki", 0, "Z", ChangeType::New).with_timestamp("yesterday");

    let record = hub.handle_event(&event).await.unwrap();
    assert_eq!(record.timestamp(), "yesterday");
}

#[tokio::test]
async fn test_source_errors_do_not_stop_processing() {
    let hub = hub(ScriptedFetcher::new());
    let items: Vec<Result<RawChangeEvent>> = vec![
        Err(FeedError::Source("connection reset".into())),
        Ok(new_page("one")),
        Err(FeedError::Source("event stream closed by server".into())),
        Err(FeedError::Status {
            status: 503,
            url: "http://stream.invalid".into(),
        }),
        Ok(new_page("two")),
    ];

    hub.run(futures::stream::iter(items), std::future::pending())
        .await;

    let titles: Vec<_> = hub.snapshot().into_iter().map(|r| r.title().to_string()).collect();
    assert_eq!(titles, vec!["two", "one"]);
}

#[tokio::test]
async fn test_shutdown_abandons_pending_lookups() {
    let fetcher = ScriptedFetcher::new();
    fetcher.diff(1, 2, "<ins>never seen</ins>");
    let _gate = fetcher.gate(1, 2);
    let hub = hub(fetcher);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let items = futures::stream::iter(vec![Ok::<_, FeedError>(edit("Pending", 1, 2))])
        .chain(futures::stream::pending());
    let run = hub.run(items, async {
        let _ = stop_rx.await;
    });

    let stopper = async {
        tokio::task::yield_now().await;
        let _ = stop_tx.send(());
    };
    tokio::join!(run, stopper);

    assert_eq!(hub.history_len(), 0);
}
