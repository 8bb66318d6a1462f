//! The network side of the cache.
//!
//! [`RoomFetcher`] is implemented by whatever talks to the homeserver. The
//! cache only ever pulls two things through it: the initial room snapshot and
//! older history behind a cursor. Newer events are pushed in from the sync
//! loop instead (see [`crate::registry::RoomRegistry::deliver`]).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use scrollback_types::{Cursor, Event, RoomId};
use thiserror::Error;

/// Errors surfaced by a [`RoomFetcher`].
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),
    #[error("invalid pagination cursor: {0:?}")]
    InvalidCursor(Cursor),
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Snapshot returned by the initial room sync.
#[derive(Debug, Clone, Default)]
pub struct InitialSync {
    /// Current room state.
    pub state: Vec<Event>,
    /// Most recent messages, chronological (oldest first).
    pub chunk: Vec<Event>,
    /// Cursor at the older edge of `chunk`.
    pub start: Cursor,
    /// Cursor at the newer edge of `chunk`.
    pub end: Cursor,
}

/// One page of older history.
#[derive(Debug, Clone, Default)]
pub struct OlderPage {
    /// Newest first, continuing directly behind the cursor that was passed in.
    /// Fewer events than requested (including none) means history starts here.
    pub events: Vec<Event>,
    /// Cursor to continue from next time.
    pub end: Cursor,
}

/// Performs the paginated history round-trips for the cache.
#[async_trait]
pub trait RoomFetcher: Send + Sync {
    /// Fetch room state plus the most recent `limit` messages.
    async fn fetch_initial(&self, room_id: &RoomId, limit: usize) -> Result<InitialSync, FetchError>;

    /// Fetch up to `limit` events older than `from`.
    async fn fetch_older(
        &self,
        room_id: &RoomId,
        from: &Cursor,
        limit: usize,
    ) -> Result<OlderPage, FetchError>;
}

/// Bound a fetch by `timeout`. An elapsed timer becomes [`FetchError::Timeout`].
pub(crate) async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_fetch_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, FetchError>(())
        };
        let err = with_timeout(Duration::from_secs(1), slow).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_timeout_passes_through_result() {
        let ok = with_timeout(Duration::from_secs(1), async { Ok::<_, FetchError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = with_timeout(Duration::from_secs(1), async {
            Err::<(), _>(FetchError::Transport("boom".into()))
        })
        .await;
        assert!(matches!(err, Err(FetchError::Transport(_))));
    }
}
