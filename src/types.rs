//! Core types for the change feed.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary text carried by every [`ChangeKind::Deleted`] record.
pub const DELETED_MARKER: &str = "Page deleted";

/// Display format for record timestamps (`1/15/2024, 1:05:09 PM`).
const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Kind of change reported by the event source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeType {
    Edit,
    New,
    Delete,
    Log,
    /// Anything else the source emits (`categorize`, `external`, ...).
    #[default]
    Other,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Edit => "edit",
            ChangeType::New => "new",
            ChangeType::Delete => "delete",
            ChangeType::Log => "log",
            ChangeType::Other => "other",
        }
    }
}

impl From<String> for ChangeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "edit" => ChangeType::Edit,
            "new" => ChangeType::New,
            "delete" => ChangeType::Delete,
            "log" => ChangeType::Log,
            _ => ChangeType::Other,
        }
    }
}

impl From<ChangeType> for String {
    fn from(t: ChangeType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Revision identifiers attached to an edit.
///
/// A missing or zero identifier means "no such revision" (a page's first
/// revision has no predecessor).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionPair {
    #[serde(default)]
    pub old: Option<u64>,
    #[serde(default)]
    pub new: Option<u64>,
}

impl RevisionPair {
    pub fn new(old: u64, new: u64) -> Self {
        Self {
            old: Some(old),
            new: Some(new),
        }
    }

    /// Both identifiers, if both are present and non-zero.
    pub fn ids(&self) -> Option<(u64, u64)> {
        match (self.old, self.new) {
            (Some(old), Some(new)) if old != 0 && new != 0 => Some((old, new)),
            _ => None,
        }
    }
}

/// Event metadata envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// ISO-8601 time of the event.
    #[serde(default)]
    pub dt: String,
}

/// A raw edit notification as delivered by the event source.
///
/// Field names follow the `recentchange` stream schema; unknown fields are
/// ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChangeEvent {
    /// Site identifier, e.g. `enwiki`.
    #[serde(rename = "wiki", default)]
    pub site: String,

    /// Content namespace; absent on some event kinds.
    #[serde(default)]
    pub namespace: Option<i64>,

    #[serde(default)]
    pub title: String,

    #[serde(rename = "type", default)]
    pub change_type: ChangeType,

    #[serde(default)]
    pub meta: EventMeta,

    #[serde(default)]
    pub revision: Option<RevisionPair>,
}

impl RawChangeEvent {
    /// Build an event for the given site and namespace.
    pub fn new(
        site: impl Into<String>,
        namespace: i64,
        title: impl Into<String>,
        change_type: ChangeType,
    ) -> Self {
        Self {
            site: site.into(),
            namespace: Some(namespace),
            title: title.into(),
            change_type,
            meta: EventMeta::default(),
            revision: None,
        }
    }

    pub fn with_timestamp(mut self, dt: impl Into<String>) -> Self {
        self.meta.dt = dt.into();
        self
    }

    pub fn with_revisions(mut self, old: u64, new: u64) -> Self {
        self.revision = Some(RevisionPair::new(old, new));
        self
    }

    /// Raw event time.
    pub fn timestamp(&self) -> &str {
        &self.meta.dt
    }

    /// Both revision identifiers, if the event carries a usable pair.
    pub fn revision_ids(&self) -> Option<(u64, u64)> {
        self.revision.as_ref().and_then(RevisionPair::ids)
    }
}

/// What happened to the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    New,
    Deleted,
    Edited,
}

/// A finalized change, ready for the history buffer and for viewers.
///
/// Construct through [`ChangeRecord::new_page`], [`ChangeRecord::deleted`]
/// or [`ChangeRecord::edited`]; the latter refuses an empty summary so an
/// `Edited` record always carries visible text. Fields are read-only once
/// constructed:
///
/// ```compile_fail
/// use changefeed::{ChangeKind, ChangeRecord};
///
/// let mut record = ChangeRecord::new_page("Bar", "t");
/// record.kind = ChangeKind::Edited;
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RecordWire", try_from = "RecordWire")]
pub struct ChangeRecord {
    title: String,
    /// Display time, fixed at creation.
    timestamp: String,
    kind: ChangeKind,
    summary: Option<String>,
}

impl ChangeRecord {
    pub fn new_page(title: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            timestamp: timestamp.into(),
            kind: ChangeKind::New,
            summary: None,
        }
    }

    pub fn deleted(title: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            timestamp: timestamp.into(),
            kind: ChangeKind::Deleted,
            summary: Some(DELETED_MARKER.to_string()),
        }
    }

    /// Returns `None` if `summary` is blank.
    pub fn edited(
        title: impl Into<String>,
        timestamp: impl Into<String>,
        summary: impl Into<String>,
    ) -> Option<Self> {
        let summary = summary.into();
        if summary.trim().is_empty() {
            return None;
        }
        Some(Self {
            title: title.into(),
            timestamp: timestamp.into(),
            kind: ChangeKind::Edited,
            summary: Some(summary),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn is_new(&self) -> bool {
        self.kind == ChangeKind::New
    }
}

/// JSON shape sent to viewers: `{title, timestamp, isNew?, summary?}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RecordWire {
    title: String,
    timestamp: String,
    #[serde(rename = "isNew", default, skip_serializing_if = "Option::is_none")]
    is_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

impl From<ChangeRecord> for RecordWire {
    fn from(record: ChangeRecord) -> Self {
        Self {
            is_new: record.is_new().then_some(true),
            title: record.title,
            timestamp: record.timestamp,
            summary: record.summary,
        }
    }
}

impl TryFrom<RecordWire> for ChangeRecord {
    type Error = String;

    fn try_from(wire: RecordWire) -> std::result::Result<Self, Self::Error> {
        if wire.is_new == Some(true) {
            return Ok(ChangeRecord::new_page(wire.title, wire.timestamp));
        }
        match wire.summary {
            Some(s) if s == DELETED_MARKER => Ok(ChangeRecord::deleted(wire.title, wire.timestamp)),
            Some(s) => ChangeRecord::edited(wire.title, wire.timestamp, s)
                .ok_or_else(|| "edited record with blank summary".to_string()),
            None => Err("record has neither isNew nor summary".to_string()),
        }
    }
}

/// Format a raw event time for display in the server's local zone.
///
/// Input that is not RFC 3339 is returned unchanged.
pub fn format_timestamp(raw: &str) -> String {
    format_timestamp_in(raw, &Local)
}

/// Format a raw event time for display in `tz`.
pub fn format_timestamp_in<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}
