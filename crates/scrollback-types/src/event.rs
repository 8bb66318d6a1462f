//! Timeline events.
//!
//! An [`Event`] is stored exactly as the server delivered it. The cache never
//! mutates one in place; reads hand out clones. The payload stays an opaque
//! JSON value — only the room-state reducer peeks into `content`, and only
//! for the handful of state types listed in [`EventKind`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::EventId;

/// Well-known event type tags.
///
/// Anything this crate doesn't inspect lands in [`EventKind::Other`] with the
/// raw tag preserved.
#[derive(Clone, Debug, PartialEq, Eq, EnumString)]
pub enum EventKind {
    #[strum(serialize = "m.room.redaction")]
    Redaction,
    #[strum(serialize = "m.room.create")]
    Create,
    #[strum(serialize = "m.room.name")]
    Name,
    #[strum(serialize = "m.room.topic")]
    Topic,
    #[strum(serialize = "m.room.avatar")]
    Avatar,
    #[strum(serialize = "m.room.member")]
    Member,
    #[strum(serialize = "m.room.canonical_alias")]
    CanonicalAlias,
    #[strum(serialize = "m.room.aliases")]
    Aliases,
    #[strum(default)]
    Other(String),
}

impl EventKind {
    /// Classify a raw type tag. Never fails; unknown tags become `Other`.
    pub fn parse(tag: &str) -> Self {
        <Self as FromStr>::from_str(tag).unwrap_or_else(|_| EventKind::Other(tag.to_string()))
    }

    /// The wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Redaction => "m.room.redaction",
            EventKind::Create => "m.room.create",
            EventKind::Name => "m.room.name",
            EventKind::Topic => "m.room.topic",
            EventKind::Avatar => "m.room.avatar",
            EventKind::Member => "m.room.member",
            EventKind::CanonicalAlias => "m.room.canonical_alias",
            EventKind::Aliases => "m.room.aliases",
            EventKind::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timeline item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    /// Raw type tag, e.g. `m.room.message`.
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub sender: String,
    /// Present on state events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    /// Milliseconds since the unix epoch, as stamped by the origin server.
    #[serde(default)]
    pub origin_server_ts: u64,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl Event {
    /// Build a non-state event with empty content.
    pub fn new(event_id: impl Into<EventId>, event_type: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            sender: String::new(),
            state_key: None,
            origin_server_ts: 0,
            content: serde_json::Value::Null,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn with_state_key(mut self, state_key: impl Into<String>) -> Self {
        self.state_key = Some(state_key.into());
        self
    }

    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    pub fn with_timestamp(mut self, origin_server_ts: u64) -> Self {
        self.origin_server_ts = origin_server_ts;
        self
    }

    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event_type)
    }

    /// Redactions never become timeline rows; the server has already applied them.
    pub fn is_redaction(&self) -> bool {
        self.event_type == EventKind::Redaction.as_str()
    }

    pub fn is_state(&self) -> bool {
        self.state_key.is_some()
    }

    /// String field from `content`, if present.
    pub fn content_str(&self, field: &str) -> Option<&str> {
        self.content.get(field).and_then(|v| v.as_str())
    }
}
