//! Client for the live `recentchange` event stream.

use crate::error::{FeedError, Result};
use crate::types::RawChangeEvent;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Public Wikimedia EventStreams endpoint.
pub const DEFAULT_STREAM_URL: &str = "https://stream.wikimedia.org/v2/stream/recentchange";

/// Longest stream line accepted before the connection is dropped.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Silence on the stream after which the connection is considered dead.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

const LAST_EVENT_ID: &str = "Last-Event-ID";

type FrameStream = BoxStream<'static, std::result::Result<Event, EventStreamError<FeedError>>>;

/// Follows a `recentchange` stream over HTTP.
#[derive(Clone, Debug)]
pub struct RecentChangeSource {
    client: Client,
    url: String,
    reconnect_delay: Duration,
    idle_timeout: Duration,
}

impl RecentChangeSource {
    pub fn new(client: Client, url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            reconnect_delay,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Drop and reconnect a connection that delivers nothing for `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Endless stream of raw events.
    ///
    /// Connection failures, dropped or idle connections and oversized lines
    /// surface as `Err` items; the stream then waits `reconnect_delay` and
    /// reconnects, resuming after the last received event. Frames that do
    /// not parse as change events are skipped.
    pub fn into_stream(self) -> impl Stream<Item = Result<RawChangeEvent>> + Send + 'static {
        let state = StreamState {
            source: self,
            frames: None,
            last_event_id: None,
            reconnecting: false,
        };
        stream::unfold(state, |mut state| async move {
            let item = state.next_item().await;
            Some((item, state))
        })
    }

    async fn connect(&self, last_event_id: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(&self.url).header(ACCEPT, "text/event-stream");
        if let Some(id) = last_event_id {
            request = request.header(LAST_EVENT_ID, id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        Ok(response)
    }
}

struct StreamState {
    source: RecentChangeSource,
    frames: Option<FrameStream>,
    last_event_id: Option<String>,
    reconnecting: bool,
}

impl StreamState {
    async fn next_item(&mut self) -> Result<RawChangeEvent> {
        loop {
            let frames = match self.frames.as_mut() {
                Some(frames) => frames,
                None => {
                    if self.reconnecting {
                        tokio::time::sleep(self.source.reconnect_delay).await;
                    }
                    self.reconnecting = true;
                    let response = self.source.connect(self.last_event_id.as_deref()).await?;
                    info!(url = %self.source.url, "connected to event stream");
                    let chunks = limit_line_length(response.bytes_stream(), MAX_LINE_BYTES);
                    self.frames = Some(chunks.eventsource().boxed());
                    continue;
                }
            };

            let next = match tokio::time::timeout(self.source.idle_timeout, frames.next()).await {
                Ok(next) => next,
                Err(_) => {
                    self.frames = None;
                    return Err(FeedError::Source(format!(
                        "event stream idle for {:?}",
                        self.source.idle_timeout
                    )));
                }
            };

            match next {
                Some(Ok(frame)) => {
                    if !frame.id.is_empty() {
                        self.last_event_id = Some(frame.id.clone());
                    }
                    if let Some(event) = parse_frame(&frame) {
                        return Ok(event);
                    }
                }
                Some(Err(e)) => {
                    self.frames = None;
                    return Err(match e {
                        EventStreamError::Transport(e) => e,
                        other => FeedError::Source(format!("malformed event stream: {}", other)),
                    });
                }
                None => {
                    self.frames = None;
                    return Err(FeedError::Source("event stream closed by server".into()));
                }
            }
        }
    }
}

/// Fail the stream once a line grows past `max` bytes without a newline.
fn limit_line_length<S, B, E>(chunks: S, max: usize) -> impl Stream<Item = Result<B>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<FeedError>,
{
    chunks.scan(0usize, move |line_len, chunk| {
        let item = match chunk {
            Ok(chunk) => {
                let bytes = chunk.as_ref();
                *line_len = match bytes.iter().rposition(|&b| b == b'\n') {
                    Some(pos) => bytes.len() - pos - 1,
                    None => *line_len + bytes.len(),
                };
                if *line_len > max {
                    Err(FeedError::Source(format!(
                        "event stream line exceeds {} bytes",
                        max
                    )))
                } else {
                    Ok(chunk)
                }
            }
            Err(e) => Err(e.into()),
        };
        future::ready(Some(item))
    })
}

/// Decode one SSE frame into a change event, if it is one.
fn parse_frame(frame: &Event) -> Option<RawChangeEvent> {
    if !matches!(frame.event.as_str(), "" | "message") {
        trace!(event = %frame.event, "ignoring non-message frame");
        return None;
    }
    match serde_json::from_str(&frame.data) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(error = %e, "skipping undecodable frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeType;

    fn frame(event: &str, data: &str) -> Event {
        Event {
            event: event.to_string(),
            data: data.to_string(),
            id: String::new(),
            retry: None,
        }
    }

    #[test]
    fn test_parse_message_frame() {
        let event = parse_frame(&frame(
            "message",
            r#"{"wiki":"enwiki","namespace":0,"title":"X","type":"new","meta":{"dt":"2024-01-01T00:00:00Z"}}"#,
        ))
        .unwrap();
        assert_eq!(event.title, "X");
        assert_eq!(event.change_type, ChangeType::New);
    }

    #[test]
    fn test_parse_skips_other_frames() {
        assert!(parse_frame(&frame("error", "{}")).is_none());
        assert!(parse_frame(&frame("", "not json")).is_none());
    }

    #[tokio::test]
    async fn test_frames_decode_across_chunks() {
        let chunks: Vec<Result<&[u8]>> = vec![
            Ok(&b"id: 7\nda"[..]),
            Ok(&b"ta: {\"title\":\"Split\",\"type\":\"new\"}\n"[..]),
            Ok(&b"\n: keep-alive\n\n"[..]),
        ];
        let frames: Vec<Event> = limit_line_length(stream::iter(chunks), 64)
            .eventsource()
            .map(|frame| frame.unwrap())
            .collect()
            .await;

        assert_eq!(frames[0].id, "7");
        let events: Vec<_> = frames.iter().filter_map(parse_frame).collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Split");
    }

    #[tokio::test]
    async fn test_overlong_line_is_rejected() {
        let chunks: Vec<Result<Vec<u8>>> = vec![
            Ok(b"data: ".to_vec()),
            Ok(vec![b'x'; 40]),
            Ok(vec![b'x'; 40]),
        ];
        let items: Vec<_> = limit_line_length(stream::iter(chunks), 64).collect().await;

        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert!(matches!(items[2], Err(FeedError::Source(_))));
    }

    #[tokio::test]
    async fn test_newlines_reset_line_length() {
        let line = [vec![b'x'; 60], b"\n".to_vec()].concat();
        let chunks: Vec<Result<Vec<u8>>> = (0..10).map(|_| Ok(line.clone())).collect();
        let items: Vec<_> = limit_line_length(stream::iter(chunks), 64).collect().await;

        assert!(items.iter().all(|item| item.is_ok()));
    }

    #[tokio::test]
    async fn test_unreachable_stream_yields_error() {
        let source = RecentChangeSource::new(
            Client::new(),
            "http://127.0.0.1:1/stream",
            Duration::from_millis(1),
        );
        let mut stream = Box::pin(source.into_stream());
        assert!(stream.next().await.unwrap().is_err());
        // Keeps trying after a failure.
        assert!(stream.next().await.unwrap().is_err());
    }
}
