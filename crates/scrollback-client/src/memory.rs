//! In-memory [`RoomFetcher`] backed by complete room histories.
//!
//! Used for testing and offline replay. Each room holds its whole history in
//! chronological order; cursors are `t<k>`, meaning "everything before
//! index k". Appending live events never shifts an existing cursor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use scrollback_types::{Cursor, Event, RoomId};

use crate::fetch::{FetchError, InitialSync, OlderPage, RoomFetcher};

#[derive(Debug, Clone, Default)]
struct RoomHistory {
    state: Vec<Event>,
    /// Oldest first.
    timeline: Vec<Event>,
}

/// Call counters, for asserting fetch behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub initial_calls: usize,
    pub older_calls: usize,
    /// `limit` of each `fetch_older` call, in call order.
    pub older_limits: Vec<usize>,
}

/// In-memory fetcher. Thread-safe; all data is lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    rooms: RwLock<HashMap<RoomId, RoomHistory>>,
    stats: Mutex<FetchStats>,
    fail_older: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

fn cursor_at(index: usize) -> Cursor {
    Cursor::new(format!("t{index}"))
}

fn parse_cursor(cursor: &Cursor) -> Result<usize, FetchError> {
    cursor
        .as_str()
        .strip_prefix('t')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| FetchError::InvalidCursor(cursor.clone()))
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a room with its state and chronological (oldest first) history.
    pub fn insert_room(&self, room_id: RoomId, state: Vec<Event>, timeline: Vec<Event>) {
        self.rooms.write().insert(room_id, RoomHistory { state, timeline });
    }

    /// Append newly "sent" events to a room's history.
    pub fn push_live(&self, room_id: &RoomId, events: Vec<Event>) -> Result<(), FetchError> {
        let mut rooms = self.rooms.write();
        let history = rooms
            .get_mut(room_id)
            .ok_or_else(|| FetchError::UnknownRoom(room_id.clone()))?;
        history.timeline.extend(events);
        Ok(())
    }

    /// Events after `since`, plus the cursor at the current newest edge.
    ///
    /// This is what a sync loop would deliver; the cache never calls it.
    pub fn newer_since(
        &self,
        room_id: &RoomId,
        since: &Cursor,
    ) -> Result<(Vec<Event>, Cursor), FetchError> {
        let rooms = self.rooms.read();
        let history = rooms
            .get(room_id)
            .ok_or_else(|| FetchError::UnknownRoom(room_id.clone()))?;
        let from = parse_cursor(since)?.min(history.timeline.len());
        Ok((
            history.timeline[from..].to_vec(),
            cursor_at(history.timeline.len()),
        ))
    }

    /// Make the next `n` `fetch_older` calls fail with a transport error.
    pub fn fail_next_older(&self, n: usize) {
        self.fail_older.store(n, Ordering::SeqCst);
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    pub fn stats(&self) -> FetchStats {
        self.stats.lock().clone()
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RoomFetcher for MemoryFetcher {
    async fn fetch_initial(&self, room_id: &RoomId, limit: usize) -> Result<InitialSync, FetchError> {
        self.stats.lock().initial_calls += 1;
        self.simulate_latency().await;

        let rooms = self.rooms.read();
        let history = rooms
            .get(room_id)
            .ok_or_else(|| FetchError::UnknownRoom(room_id.clone()))?;

        let len = history.timeline.len();
        let start = len.saturating_sub(limit);
        Ok(InitialSync {
            state: history.state.clone(),
            chunk: history.timeline[start..].to_vec(),
            start: cursor_at(start),
            end: cursor_at(len),
        })
    }

    async fn fetch_older(
        &self,
        room_id: &RoomId,
        from: &Cursor,
        limit: usize,
    ) -> Result<OlderPage, FetchError> {
        {
            let mut stats = self.stats.lock();
            stats.older_calls += 1;
            stats.older_limits.push(limit);
        }
        self.simulate_latency().await;

        let failing = self
            .fail_older
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(FetchError::Transport("injected failure".to_string()));
        }

        let rooms = self.rooms.read();
        let history = rooms
            .get(room_id)
            .ok_or_else(|| FetchError::UnknownRoom(room_id.clone()))?;

        let end = parse_cursor(from)?;
        if end > history.timeline.len() {
            return Err(FetchError::InvalidCursor(from.clone()));
        }
        let start = end.saturating_sub(limit);
        Ok(OlderPage {
            events: history.timeline[start..end].iter().rev().cloned().collect(),
            end: cursor_at(start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomId {
        RoomId::new("!mem:hs")
    }

    fn fetcher_with(n: usize) -> MemoryFetcher {
        let fetcher = MemoryFetcher::new();
        let timeline = (0..n).map(|i| Event::new(format!("$e{i}"), "m.room.message")).collect();
        fetcher.insert_room(room(), vec![], timeline);
        fetcher
    }

    #[tokio::test]
    async fn test_initial_returns_latest_chunk() {
        let fetcher = fetcher_with(10);
        let sync = fetcher.fetch_initial(&room(), 4).await.unwrap();

        let ids: Vec<_> = sync.chunk.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["$e6", "$e7", "$e8", "$e9"]);
        assert_eq!(sync.start.as_str(), "t6");
        assert_eq!(sync.end.as_str(), "t10");
    }

    #[tokio::test]
    async fn test_older_pages_walk_back_to_start() {
        let fetcher = fetcher_with(5);
        let page = fetcher.fetch_older(&room(), &Cursor::new("t4"), 3).await.unwrap();
        let ids: Vec<_> = page.events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["$e3", "$e2", "$e1"]);
        assert_eq!(page.end.as_str(), "t1");

        let page = fetcher.fetch_older(&room(), &page.end, 3).await.unwrap();
        assert_eq!(page.events.len(), 1);
        let page = fetcher.fetch_older(&room(), &page.end, 3).await.unwrap();
        assert!(page.events.is_empty());
        assert_eq!(page.end.as_str(), "t0");

        assert_eq!(fetcher.stats().older_limits, vec![3, 3, 3]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let fetcher = fetcher_with(5);
        fetcher.fail_next_older(1);

        let err = fetcher.fetch_older(&room(), &Cursor::new("t5"), 2).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert!(fetcher.fetch_older(&room(), &Cursor::new("t5"), 2).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_cursor_and_room() {
        let fetcher = fetcher_with(2);
        assert!(matches!(
            fetcher.fetch_older(&room(), &Cursor::new("garbage"), 1).await,
            Err(FetchError::InvalidCursor(_))
        ));
        assert!(matches!(
            fetcher.fetch_older(&room(), &Cursor::new("t9"), 1).await,
            Err(FetchError::InvalidCursor(_))
        ));
        assert!(matches!(
            fetcher.fetch_initial(&RoomId::new("!other:hs"), 1).await,
            Err(FetchError::UnknownRoom(_))
        ));
    }

    #[test]
    fn test_newer_since() {
        let fetcher = fetcher_with(3);
        fetcher
            .push_live(&room(), vec![Event::new("$n", "m.room.message")])
            .unwrap();

        let (events, end) = fetcher.newer_since(&room(), &Cursor::new("t3")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id.as_str(), "$n");
        assert_eq!(end.as_str(), "t4");
    }
}
