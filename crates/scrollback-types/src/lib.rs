//! Shared types for scrollback — the data the timeline cache is built from.
//!
//! - [`ids`]: typed string identifiers for rooms and events, plus pagination cursors
//! - [`event`]: the immutable timeline [`Event`] and its well-known [`EventKind`] tags
//! - [`summary`]: the [`RoomSummary`] projection and the [`MxcUrl`] avatar reference
//!
//! No I/O and no async here; everything is plain serde-serializable data.

pub mod event;
pub mod ids;
pub mod summary;

pub use event::{Event, EventKind};
pub use ids::{Cursor, EventId, RoomId};
pub use summary::{MxcUrl, MxcUrlError, RoomSummary};
