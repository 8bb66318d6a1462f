//! Client-side cache of room timelines with anchor-relative paging.
//!
//! A [`RoomRegistry`] attaches rooms on first use. Each attached room is a
//! [`RoomWindow`]: an in-memory [`Timeline`] that grows backward on demand
//! through a [`RoomFetcher`] and forward from live delivery.
//!
//! ```no_run
//! # async fn demo(fetcher: std::sync::Arc<dyn scrollback_client::RoomFetcher>) -> Result<(), scrollback_client::WindowError> {
//! use scrollback_client::{RoomRegistry, WindowConfig};
//! use scrollback_types::{EventId, RoomId};
//!
//! let (registry, _catch_up) = RoomRegistry::new(fetcher, WindowConfig::default());
//! let room = registry.room(&RoomId::new("!abc:example.org")).await?;
//! let latest = room.page(&EventId::latest(), 0, 20).await?;
//! # Ok(()) }
//! ```

pub mod config;
pub mod constants;
pub mod fetch;
pub mod memory;
pub mod registry;
pub mod room_state;
pub mod timeline;
pub mod window;

pub use config::{ConfigError, WindowConfig};
pub use fetch::{FetchError, InitialSync, OlderPage, RoomFetcher};
pub use memory::{FetchStats, MemoryFetcher};
pub use registry::{LiveUpdate, RoomRegistry};
pub use room_state::{RoomState, RoomStateReducer};
pub use timeline::Timeline;
pub use window::{CatchUpRequest, RoomWindow, WindowError};
