//! The cached event window for one room.
//!
//! Index 0 is the most recent event we know about; indices grow toward older
//! history. The window only ever grows: older pages are appended at the back,
//! live events are pushed on the front. The two cursors always describe the
//! exact edges of what is cached.
//!
//! ```text
//!   newer cursor                                        older cursor
//!        │                                                   │
//!        ▼                                                   ▼
//!   ┌────┬────┬────┬────┬────┬────┬─────────────────────────┐
//!   │ 0  │ 1  │ 2  │ 3  │ 4  │ 5  │ ...                     │
//!   └────┴────┴────┴────┴────┴────┴─────────────────────────┘
//!   ◀── extend_newer (live)                 extend_older ──▶
//! ```
//!
//! Nothing in here synchronizes; [`crate::window::RoomWindow`] owns the lock.

use std::collections::VecDeque;
use std::ops::Range;
use std::time::Duration;

use scrollback_types::{Cursor, Event, EventId, RoomId};
use tracing::{debug, trace};

use crate::fetch::{FetchError, InitialSync, OlderPage, RoomFetcher, with_timeout};
use crate::room_state::RoomStateReducer;

/// Drop redactions and, for live events, fold the survivors into room state.
///
/// Every growth path goes through here so the redaction policy lives in one
/// place. Redactions have already been applied server-side; letting them
/// through would show up as blank rows.
pub(crate) fn admit_events(
    events: impl IntoIterator<Item = Event>,
    mut fold: Option<&mut dyn RoomStateReducer>,
) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| {
            if event.is_redaction() {
                trace!(event_id = %event.event_id, "dropping redaction");
                return false;
            }
            true
        })
        .inspect(|event| {
            if let Some(state) = fold.as_deref_mut() {
                state.update_on_event(event, false);
            }
        })
        .collect()
}

/// Depth the window should reach to serve a backward page comfortably.
pub(crate) fn needed_depth(anchor: usize, offset: usize, count: usize, buffer: usize) -> usize {
    anchor
        .saturating_add(offset)
        .saturating_add(count)
        .saturating_add(buffer)
}

/// Slice bounds for a page `offset` events older than `anchor`.
pub(crate) fn backward_bounds(anchor: usize, offset: usize, count: usize, len: usize) -> Range<usize> {
    let start = anchor.saturating_add(offset).min(len);
    let end = start.saturating_add(count).min(len);
    start..end
}

/// Slice bounds for a page `offset` events newer than `anchor`.
///
/// The top of the page is `anchor + count - offset`, clamped into the window;
/// the page then extends `count` events toward index 0, stopping there.
pub(crate) fn forward_bounds(anchor: usize, offset: usize, count: usize, len: usize) -> Range<usize> {
    let top = anchor.saturating_add(count).saturating_sub(offset).min(len);
    let bottom = top.saturating_sub(count);
    bottom..top
}

/// Ordered in-memory cache of one room's events plus its two edge cursors.
#[derive(Debug, Clone)]
pub struct Timeline {
    room_id: RoomId,
    events: VecDeque<Event>,
    /// Continue backward pagination from here.
    older: Cursor,
    /// Live delivery has caught up to here.
    newer: Cursor,
}

impl Timeline {
    /// Build the window from the initial room sync.
    ///
    /// The state snapshot is folded as an initial application. The message
    /// chunk arrives oldest first and is flipped so the newest lands at index 0.
    pub fn initialize(
        room_id: RoomId,
        sync: InitialSync,
        state: &mut dyn RoomStateReducer,
    ) -> Self {
        for event in &sync.state {
            state.update_on_event(event, true);
        }

        let delivered = sync.chunk.len();
        let events: VecDeque<Event> = admit_events(sync.chunk, None).into_iter().rev().collect();

        debug!(
            room_id = %room_id,
            delivered,
            kept = events.len(),
            state_events = sync.state.len(),
            "timeline initialized"
        );

        Self {
            room_id,
            events,
            older: sync.start,
            newer: sync.end,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn older_cursor(&self) -> &Cursor {
        &self.older
    }

    pub fn newer_cursor(&self) -> &Cursor {
        &self.newer
    }

    /// Index of `event_id`. Linear; windows are bounded by what callers page through.
    pub fn position(&self, event_id: &EventId) -> Option<usize> {
        self.events.iter().position(|event| &event.event_id == event_id)
    }

    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    /// Owned copy of `range`. The range must lie inside the window.
    pub fn slice(&self, range: Range<usize>) -> Vec<Event> {
        self.events.range(range).cloned().collect()
    }

    /// Append an already fetched page of older history.
    ///
    /// Returns the number of events appended, which is less than the page
    /// size when it contained redactions.
    pub fn append_older(&mut self, page: OlderPage) -> usize {
        let admitted = admit_events(page.events, None);
        let added = admitted.len();
        self.events.extend(admitted);
        self.older = page.end;
        added
    }

    /// Fetch up to `count` older events behind the older cursor and append them.
    ///
    /// On error the window is untouched: cursor and events move together or
    /// not at all. Zero events back is the start of history, not an error.
    pub async fn extend_older(
        &mut self,
        fetcher: &dyn RoomFetcher,
        count: usize,
        timeout: Duration,
    ) -> Result<usize, FetchError> {
        debug!(
            room_id = %self.room_id,
            from = %self.older,
            count,
            "extending timeline backward"
        );
        let page = with_timeout(timeout, fetcher.fetch_older(&self.room_id, &self.older, count)).await?;
        let added = self.append_older(page);
        debug!(room_id = %self.room_id, added, len = self.len(), "backward extension done");
        Ok(added)
    }

    /// Push live events (chronological) onto the front and move the newer cursor.
    ///
    /// Survivors are folded into `state`; the last one ends up at index 0.
    pub fn extend_newer(
        &mut self,
        events: Vec<Event>,
        end: Cursor,
        state: &mut dyn RoomStateReducer,
    ) -> usize {
        let admitted = admit_events(events, Some(state));
        let added = admitted.len();
        for event in admitted {
            self.events.push_front(event);
        }
        self.newer = end;
        trace!(room_id = %self.room_id, added, len = self.len(), "live events prepended");
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room_state::RoomState;
    use serde_json::json;

    fn msg(id: &str) -> Event {
        Event::new(id, "m.room.message").with_sender("@a:hs")
    }

    fn redaction(id: &str) -> Event {
        Event::new(id, "m.room.redaction")
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.event_id.as_str()).collect()
    }

    fn window(n: usize) -> Timeline {
        // Chronological chunk e0 (oldest) .. e{n-1} (newest).
        let chunk = (0..n).map(|i| msg(&format!("$e{i}"))).collect();
        let sync = InitialSync {
            state: vec![],
            chunk,
            start: Cursor::new("start"),
            end: Cursor::new("end"),
        };
        Timeline::initialize(RoomId::new("!r:hs"), sync, &mut RoomState::new())
    }

    // =========================================================================
    // Range math
    // =========================================================================

    #[test]
    fn test_backward_bounds_clamp() {
        assert_eq!(backward_bounds(0, 0, 5, 10), 0..5);
        assert_eq!(backward_bounds(0, 5, 5, 13), 5..10);
        assert_eq!(backward_bounds(2, 5, 5, 9), 7..9);
        assert_eq!(backward_bounds(0, 20, 5, 10), 10..10);
        assert_eq!(backward_bounds(0, usize::MAX, 5, 10), 10..10);
    }

    #[test]
    fn test_forward_bounds_clamp() {
        // Anchor 5, three newer: top = 5 + 3 - 2 = 6.
        assert_eq!(forward_bounds(5, 2, 3, 10), 3..6);
        // Running past the newest known event just shortens the page.
        assert_eq!(forward_bounds(1, 4, 3, 10), 0..0);
        assert_eq!(forward_bounds(2, 1, 3, 10), 1..4);
        // Top clamps to the window length.
        assert_eq!(forward_bounds(9, 0, 5, 10), 5..10);
    }

    #[test]
    fn test_needed_depth_saturates() {
        assert_eq!(needed_depth(0, 5, 5, 32), 42);
        assert_eq!(needed_depth(usize::MAX, 1, 1, 32), usize::MAX);
    }

    // =========================================================================
    // Growth
    // =========================================================================

    #[test]
    fn test_initialize_newest_first_without_redactions() {
        let sync = InitialSync {
            state: vec![],
            chunk: vec![msg("$a"), redaction("$r"), msg("$b"), msg("$c")],
            start: Cursor::new("s"),
            end: Cursor::new("e"),
        };
        let tl = Timeline::initialize(RoomId::new("!r:hs"), sync, &mut RoomState::new());

        assert_eq!(ids(&tl.slice(0..tl.len())), vec!["$c", "$b", "$a"]);
        assert_eq!(tl.older_cursor().as_str(), "s");
        assert_eq!(tl.newer_cursor().as_str(), "e");
    }

    #[test]
    fn test_initialize_folds_state_as_initial() {
        let topic = Event::new("$t", "m.room.topic").with_content(json!({ "topic": "hello" }));
        let sync = InitialSync {
            state: vec![topic],
            ..Default::default()
        };
        let mut state = RoomState::new();
        let tl = Timeline::initialize(RoomId::new("!r:hs"), sync, &mut state);

        assert!(tl.is_empty());
        // No state_key, but initial applications are trusted as state.
        assert_eq!(state.topic(), "hello");
    }

    #[test]
    fn test_append_older_keeps_order_and_moves_cursor() {
        let mut tl = window(3);
        let added = tl.append_older(OlderPage {
            events: vec![msg("$o1"), redaction("$x"), msg("$o2")],
            end: Cursor::new("older"),
        });

        assert_eq!(added, 2);
        assert_eq!(ids(&tl.slice(0..tl.len())), vec!["$e2", "$e1", "$e0", "$o1", "$o2"]);
        assert_eq!(tl.older_cursor().as_str(), "older");
        assert_eq!(tl.newer_cursor().as_str(), "end");
    }

    #[test]
    fn test_extend_newer_latest_at_front() {
        let mut tl = window(2);
        let mut state = RoomState::new();
        let topic = Event::new("$t", "m.room.topic")
            .with_state_key("")
            .with_content(json!({ "topic": "live" }));

        let added = tl.extend_newer(
            vec![msg("$n1"), topic, redaction("$x"), msg("$n2")],
            Cursor::new("newer"),
            &mut state,
        );

        assert_eq!(added, 3);
        assert_eq!(tl.get(0).map(|e| e.event_id.as_str()), Some("$n2"));
        assert_eq!(ids(&tl.slice(0..tl.len())), vec!["$n2", "$t", "$n1", "$e1", "$e0"]);
        assert_eq!(tl.newer_cursor().as_str(), "newer");
        assert_eq!(state.topic(), "live");
    }

    #[test]
    fn test_extend_newer_only_redactions_keeps_front() {
        let mut tl = window(2);
        let added = tl.extend_newer(vec![redaction("$x")], Cursor::new("n2"), &mut RoomState::new());
        assert_eq!(added, 0);
        assert_eq!(tl.get(0).map(|e| e.event_id.as_str()), Some("$e1"));
        assert_eq!(tl.newer_cursor().as_str(), "n2");
    }

    #[test]
    fn test_position() {
        let tl = window(4);
        assert_eq!(tl.position(&EventId::new("$e3")), Some(0));
        assert_eq!(tl.position(&EventId::new("$e0")), Some(3));
        assert_eq!(tl.position(&EventId::new("$nope")), None);
    }
}
