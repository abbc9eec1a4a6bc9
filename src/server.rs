//! HTTP surface for viewers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Bundled viewer page |
//! | `GET` | `/changes` | Live feed as Server-Sent Events |
//!
//! The live feed first sends the whole history as one JSON array, then one
//! single-element array per new record. Closing the connection drops the
//! subscriber.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use futures::stream::{self, Stream};
use tracing::debug;

use crate::hub::ChangeHub;
use crate::subscriptions::SubscriberHandle;

/// Application state shared across all handlers.
pub type AppState = Arc<ChangeHub>;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Creates the viewer router.
pub fn router(hub: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/changes", get(changes))
        .with_state(hub)
}

/// `GET /`: the viewer page.
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /changes`: snapshot, then live records.
async fn changes(
    State(hub): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let handle = hub.subscribe();
    debug!(subscriber = %handle.id, "viewer connected");
    Sse::new(batch_events(handle)).keep_alive(KeepAlive::default())
}

/// One SSE event per batch; ends when the subscriber is dropped.
fn batch_events(handle: SubscriberHandle) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(handle, |mut handle| async move {
        let batch = handle.recv().await?;
        Some((Event::default().json_data(&batch), handle))
    })
}
