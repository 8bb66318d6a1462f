//! Keyed registry of attached rooms.
//!
//! A room is attached on first access and stays until [`RoomRegistry::detach`].
//! Concurrent first accessors share a single initial sync: each slot is a
//! `OnceCell`, so the room's window is built exactly once. A failed attach
//! leaves the slot empty and the next access tries again.
//!
//! ```text
//!   caller ──room()──▶ RoomRegistry ──▶ Arc<RoomWindow> ──page()──▶ events
//!                          │
//!   sync loop ──deliver()──┘        RoomWindow ──trigger_forward_catch_up()──▶ mpsc
//!                                                                              │
//!   sync loop ◀────────────────────── CatchUpRequest ◀─────────────────────────┘
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use scrollback_types::{Cursor, Event, RoomId};
use tokio::sync::{OnceCell, mpsc};
use tracing::{debug, info};

use crate::config::WindowConfig;
use crate::fetch::RoomFetcher;
use crate::room_state::RoomState;
use crate::window::{CatchUpRequest, RoomWindow, WindowError};

/// Live events for one room, as produced by the sync loop.
#[derive(Debug, Clone)]
pub struct LiveUpdate {
    pub room_id: RoomId,
    /// Chronological (oldest first).
    pub events: Vec<Event>,
    /// Newer-edge cursor after these events.
    pub end: Cursor,
}

type RoomSlot = Arc<OnceCell<Arc<RoomWindow>>>;

/// Room id → window, with lazy attach and explicit teardown.
pub struct RoomRegistry {
    fetcher: Arc<dyn RoomFetcher>,
    config: WindowConfig,
    rooms: DashMap<RoomId, RoomSlot>,
    catch_up_tx: mpsc::UnboundedSender<CatchUpRequest>,
}

impl RoomRegistry {
    /// Create a registry and the receiving end of its catch-up channel.
    ///
    /// The session layer drains the receiver and answers each request with
    /// [`RoomRegistry::deliver`].
    pub fn new(
        fetcher: Arc<dyn RoomFetcher>,
        config: WindowConfig,
    ) -> (Self, mpsc::UnboundedReceiver<CatchUpRequest>) {
        let (catch_up_tx, catch_up_rx) = mpsc::unbounded_channel();
        let registry = Self {
            fetcher,
            config,
            rooms: DashMap::new(),
            catch_up_tx,
        };
        (registry, catch_up_rx)
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// The room's window, attaching it first if needed.
    pub async fn room(&self, room_id: &RoomId) -> Result<Arc<RoomWindow>, WindowError> {
        // Clone the slot out so no map shard lock is held across the sync.
        let slot = self.rooms.entry(room_id.clone()).or_default().value().clone();

        let attached = slot
            .get_or_try_init(|| async {
                let window = RoomWindow::attach(
                    room_id.clone(),
                    Arc::clone(&self.fetcher),
                    self.config.clone(),
                    self.catch_up_tx.clone(),
                    Box::new(RoomState::new()),
                )
                .await?;
                Ok::<_, WindowError>(Arc::new(window))
            })
            .await;

        match attached {
            Ok(window) => Ok(Arc::clone(window)),
            Err(err) => {
                // Only our own still-empty slot; a concurrent retry may have replaced it.
                self.rooms
                    .remove_if(room_id, |_, s| Arc::ptr_eq(s, &slot) && !s.initialized());
                Err(err)
            }
        }
    }

    /// The room's window if it's attached. Never triggers a sync.
    pub fn get(&self, room_id: &RoomId) -> Option<Arc<RoomWindow>> {
        self.rooms
            .get(room_id)
            .and_then(|slot| slot.value().get().cloned())
    }

    /// Drop a room and its cache. Returns whether it was attached.
    ///
    /// Outstanding `Arc<RoomWindow>` handles stay usable but no longer
    /// receive live updates.
    pub fn detach(&self, room_id: &RoomId) -> bool {
        let removed = self
            .rooms
            .remove(room_id)
            .is_some_and(|(_, slot)| slot.initialized());
        if removed {
            info!(room_id = %room_id, "room detached");
        }
        removed
    }

    /// IDs of every attached room, in no particular order.
    pub fn attached_rooms(&self) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Route live events to an attached room.
    ///
    /// Returns the number of events the room kept, or `None` when the room
    /// isn't attached (the update is dropped). That includes a room whose
    /// initial sync is still running; its window recovers the missed events
    /// with [`RoomWindow::trigger_forward_catch_up`].
    pub async fn deliver(&self, update: LiveUpdate) -> Option<usize> {
        let Some(window) = self.get(&update.room_id) else {
            debug!(
                room_id = %update.room_id,
                events = update.events.len(),
                "dropping live update for unattached room"
            );
            return None;
        };
        Some(window.extend_newer(update.events, update.end).await)
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("config", &self.config)
            .field("rooms", &self.rooms.len())
            .finish_non_exhaustive()
    }
}
