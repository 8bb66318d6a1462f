//! Recorded room histories.
//!
//! A history file is one room's state plus its full timeline, oldest first:
//!
//! ```json
//! { "room_id": "!abc:example.org", "state": [ ... ], "timeline": [ ... ] }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use scrollback_client::MemoryFetcher;
use scrollback_types::{Event, RoomId};

#[derive(Debug, Deserialize)]
pub struct RoomHistory {
    pub room_id: RoomId,
    #[serde(default)]
    pub state: Vec<Event>,
    #[serde(default)]
    pub timeline: Vec<Event>,
}

impl RoomHistory {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading history {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing history {}", path.display()))
    }

    /// Serve this history from an in-memory fetcher. Returns the room id.
    pub fn into_fetcher(self, fetcher: &MemoryFetcher) -> RoomId {
        fetcher.insert_room(self.room_id.clone(), self.state, self.timeline);
        self.room_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_history() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "room_id": "!r:hs",
                "timeline": [
                    {{ "event_id": "$1", "type": "m.room.message", "sender": "@a:hs" }},
                    {{ "event_id": "$2", "type": "m.room.redaction" }}
                ]
            }}"#
        )
        .unwrap();

        let history = RoomHistory::load(file.path()).unwrap();
        assert_eq!(history.room_id.as_str(), "!r:hs");
        assert!(history.state.is_empty());
        assert_eq!(history.timeline.len(), 2);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = RoomHistory::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing.json"));
    }
}
