//! Per-room façade over a [`Timeline`]: anchor resolution and page retrieval.
//!
//! All access to a room's timeline goes through one `tokio::sync::Mutex`.
//! A page request holds it across any backward fetch, so index math never
//! sees the length change underneath it and a room never has two backward
//! fetches in flight; other callers for the same room wait their turn.
//!
//! # Page requests
//!
//! - `offset >= 0`: walk toward older history from the anchor, fetching more
//!   if the window is shallower than the page plus a buffer
//! - `offset < 0`: walk toward newer history; never fetches, the newer edge
//!   only moves via live delivery

use std::sync::Arc;

use scrollback_types::{Cursor, Event, EventId, RoomId, RoomSummary};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, trace, warn};

use crate::config::WindowConfig;
use crate::fetch::{FetchError, RoomFetcher, with_timeout};
use crate::room_state::RoomStateReducer;
use crate::timeline::{Timeline, backward_bounds, forward_bounds, needed_depth};

/// Errors from a [`RoomWindow`].
#[derive(Debug, Error)]
pub enum WindowError {
    /// The anchor isn't cached, and one backward extension didn't surface it.
    #[error("event not found: {0}")]
    AnchorNotFound(EventId),
    /// The initial room sync failed; the room was not attached.
    #[error("failed to attach room {room_id}: {source}")]
    Attach {
        room_id: RoomId,
        #[source]
        source: FetchError,
    },
}

/// Request for the session layer to push newer events for a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchUpRequest {
    pub room_id: RoomId,
    /// Newer-edge cursor at the time of the request.
    pub since: Cursor,
}

struct WindowInner {
    timeline: Timeline,
    state: Box<dyn RoomStateReducer>,
}

/// One room's cached timeline plus its folded state.
pub struct RoomWindow {
    room_id: RoomId,
    fetcher: Arc<dyn RoomFetcher>,
    config: WindowConfig,
    catch_up_tx: mpsc::UnboundedSender<CatchUpRequest>,
    inner: Mutex<WindowInner>,
}

impl RoomWindow {
    /// Run the initial room sync and build the window.
    ///
    /// Failure here is fatal for the room: nothing is cached and the error
    /// propagates.
    pub async fn attach(
        room_id: RoomId,
        fetcher: Arc<dyn RoomFetcher>,
        config: WindowConfig,
        catch_up_tx: mpsc::UnboundedSender<CatchUpRequest>,
        mut state: Box<dyn RoomStateReducer>,
    ) -> Result<Self, WindowError> {
        let sync = with_timeout(
            config.fetch_timeout(),
            fetcher.fetch_initial(&room_id, config.initial_sync_limit),
        )
        .await
        .map_err(|source| WindowError::Attach {
            room_id: room_id.clone(),
            source,
        })?;

        let timeline = Timeline::initialize(room_id.clone(), sync, state.as_mut());
        info!(room_id = %room_id, cached = timeline.len(), "room attached");

        Ok(Self {
            room_id,
            fetcher,
            config,
            catch_up_tx,
            inner: Mutex::new(WindowInner { timeline, state }),
        })
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Number of cached events.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.timeline.len()
    }

    /// `page_size` events relative to `anchor`.
    ///
    /// An empty anchor means the most recent known event. Positive offsets
    /// move toward older events, negative toward newer. The only error is an
    /// anchor that can't be located; fetch failures shorten the page instead.
    pub async fn page(
        &self,
        anchor: &EventId,
        offset: i64,
        page_size: usize,
    ) -> Result<Vec<Event>, WindowError> {
        let mut inner = self.inner.lock().await;

        let anchor_index = if anchor.is_empty() {
            0
        } else {
            self.resolve_anchor_locked(&mut inner, anchor)
                .await
                .ok_or_else(|| WindowError::AnchorNotFound(anchor.clone()))?
        };

        let offset_abs = usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX);
        let events = if offset >= 0 {
            self.backward_range(&mut inner, anchor_index, offset_abs, page_size)
                .await
        } else {
            forward_range(&inner.timeline, anchor_index, offset_abs, page_size)
        };
        Ok(events)
    }

    /// Index of `event_id`, extending backward once if it isn't cached yet.
    pub async fn resolve_anchor(&self, event_id: &EventId) -> Option<usize> {
        let mut inner = self.inner.lock().await;
        self.resolve_anchor_locked(&mut inner, event_id).await
    }

    /// Lookup, one bounded extension, lookup again. Never more than one fetch.
    async fn resolve_anchor_locked(
        &self,
        inner: &mut WindowInner,
        event_id: &EventId,
    ) -> Option<usize> {
        if let Some(index) = inner.timeline.position(event_id) {
            return Some(index);
        }

        let depth = self.config.anchor_search_depth;
        debug!(room_id = %self.room_id, anchor = %event_id, depth, "anchor not cached, extending");
        match inner
            .timeline
            .extend_older(self.fetcher.as_ref(), depth, self.config.fetch_timeout())
            .await
        {
            Ok(0) => None,
            Ok(_) => inner.timeline.position(event_id),
            Err(e) => {
                warn!(room_id = %self.room_id, anchor = %event_id, error = %e, "anchor search fetch failed");
                None
            }
        }
    }

    async fn backward_range(
        &self,
        inner: &mut WindowInner,
        anchor_index: usize,
        offset: usize,
        count: usize,
    ) -> Vec<Event> {
        let mut len = inner.timeline.len();
        let needed = needed_depth(anchor_index, offset, count, self.config.overcompensation);

        if needed > len {
            match inner
                .timeline
                .extend_older(self.fetcher.as_ref(), needed - len, self.config.fetch_timeout())
                .await
            {
                Ok(added) => len += added,
                Err(e) => {
                    warn!(
                        room_id = %self.room_id,
                        needed,
                        cached = len,
                        error = %e,
                        "backward extension failed, serving cached window"
                    );
                }
            }
        }

        let range = backward_bounds(anchor_index, offset, count, len);
        trace!(room_id = %self.room_id, anchor_index, offset, count, ?range, "backward page");
        inner.timeline.slice(range)
    }

    /// Fold live events into the window. Called by the sync loop, never by a page request.
    pub async fn extend_newer(&self, events: Vec<Event>, end: Cursor) -> usize {
        let mut inner = self.inner.lock().await;
        let WindowInner { timeline, state } = &mut *inner;
        timeline.extend_newer(events, end, state.as_mut())
    }

    /// `(older, newer)` edge cursors.
    pub async fn tokens(&self) -> (Cursor, Cursor) {
        let inner = self.inner.lock().await;
        (
            inner.timeline.older_cursor().clone(),
            inner.timeline.newer_cursor().clone(),
        )
    }

    /// Current room metadata, recomputed from the reducer on every call.
    pub async fn summarize(&self) -> RoomSummary {
        let inner = self.inner.lock().await;
        let state = inner.state.as_ref();
        RoomSummary {
            room_id: self.room_id.clone(),
            name: state.calculate_name(&self.room_id),
            topic: state.topic().to_string(),
            avatar: state.avatar().cloned(),
            num_member_events: state.num_member_events(),
            num_members: state.num_members(),
            num_servers: state.servers().len(),
        }
    }

    /// Ask the session layer to push anything newer than our newer edge.
    ///
    /// Returns false when nobody is listening any more.
    pub async fn trigger_forward_catch_up(&self) -> bool {
        let since = self.inner.lock().await.timeline.newer_cursor().clone();
        let request = CatchUpRequest {
            room_id: self.room_id.clone(),
            since,
        };
        match self.catch_up_tx.send(request) {
            Ok(()) => true,
            Err(_) => {
                warn!(room_id = %self.room_id, "catch-up receiver dropped");
                false
            }
        }
    }
}

fn forward_range(timeline: &Timeline, anchor_index: usize, offset: usize, count: usize) -> Vec<Event> {
    let range = forward_bounds(anchor_index, offset, count, timeline.len());
    trace!(room_id = %timeline.room_id(), anchor_index, offset, count, ?range, "forward page");
    timeline.slice(range)
}

impl std::fmt::Debug for RoomWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomWindow")
            .field("room_id", &self.room_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
