//! Typed identifiers for rooms and events, and the opaque pagination cursor.
//!
//! Both ID types wrap the server-assigned string verbatim. They're opaque to
//! this crate and no syntax is validated. `Display` shows the full value for
//! logging; `Debug` carries a type prefix so mixed-up IDs stand out in traces.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A room identifier (`!opaque:server`).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

/// An event identifier (`$opaque`), unique within a room.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_string_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Wrap a raw identifier string.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// The raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.0)
            }
        }
    };
}

impl_string_id!(RoomId, "RoomId");
impl_string_id!(EventId, "EventId");

impl EventId {
    /// The empty ID, used as the "most recent event" anchor.
    pub fn latest() -> Self {
        Self(String::new())
    }

    /// True for the "most recent event" anchor.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Cursor ──────────────────────────────────────────────────────────────────

/// Opaque pagination continuation token bounding one edge of a cached window.
///
/// The server mints these; the client only stores and hands them back. An
/// empty cursor means the edge is unknown (nothing fetched yet).
#[derive(Clone, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// A cursor for an edge nobody has told us about yet.
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Cursor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("Cursor(<none>)")
        } else {
            write!(f, "Cursor({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_anchor_is_empty() {
        assert!(EventId::latest().is_empty());
        assert!(EventId::default().is_empty());
        assert!(!EventId::new("$e1").is_empty());
    }

    #[test]
    fn test_debug_has_type_prefix() {
        assert_eq!(format!("{:?}", EventId::new("$e1")), "EventId($e1)");
        assert_eq!(format!("{}", RoomId::new("!r:hs")), "!r:hs");
        assert_eq!(format!("{:?}", Cursor::none()), "Cursor(<none>)");
    }

    #[test]
    fn test_serde_transparent() {
        let id: EventId = serde_json::from_str("\"$abc\"").unwrap();
        assert_eq!(id.as_str(), "$abc");
        assert_eq!(serde_json::to_string(&Cursor::new("t42")).unwrap(), "\"t42\"");
    }
}
