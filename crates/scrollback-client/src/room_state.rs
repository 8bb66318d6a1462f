//! Room metadata folded from state events.
//!
//! The cache feeds events through [`RoomStateReducer::update_on_event`] and
//! reads the accumulated values back when building a
//! [`RoomSummary`](scrollback_types::RoomSummary). [`RoomState`] is the
//! bundled reducer; callers can plug in their own.

use std::collections::{BTreeMap, BTreeSet};

use scrollback_types::{Event, EventKind, MxcUrl, RoomId};
use tracing::{debug, trace};

/// Folds events into room metadata.
pub trait RoomStateReducer: Send + Sync {
    /// Apply one event. `initial` is true only for the state snapshot that
    /// comes with the initial room sync.
    fn update_on_event(&mut self, event: &Event, initial: bool);

    /// Human-facing room name.
    fn calculate_name(&self, room_id: &RoomId) -> String;

    fn topic(&self) -> &str;

    fn avatar(&self) -> Option<&MxcUrl>;

    /// Distinct member state keys seen, whatever their current membership.
    fn num_member_events(&self) -> usize;

    /// Members currently joined.
    fn num_members(&self) -> usize;

    /// Distinct homeservers among joined members.
    fn servers(&self) -> BTreeSet<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Membership {
    membership: String,
    display_name: Option<String>,
}

impl Membership {
    fn is_joined(&self) -> bool {
        self.membership == "join"
    }
}

/// Default reducer over the standard room state event types.
#[derive(Debug, Clone, Default)]
pub struct RoomState {
    name: Option<String>,
    canonical_alias: Option<String>,
    aliases: Vec<String>,
    topic: String,
    avatar: Option<MxcUrl>,
    /// Keyed by state key (the member's user id).
    members: BTreeMap<String, Membership>,
}

impl RoomState {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_member(&mut self, event: &Event) {
        let Some(user_id) = event.state_key.as_deref() else {
            return;
        };
        let Some(membership) = event.content_str("membership") else {
            trace!(user_id, "member event without membership, ignoring");
            return;
        };
        self.members.insert(
            user_id.to_string(),
            Membership {
                membership: membership.to_string(),
                display_name: event
                    .content_str("displayname")
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
            },
        );
    }

    fn joined_names(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter(|(_, m)| m.is_joined())
            .map(|(user_id, m)| m.display_name.as_deref().unwrap_or(user_id.as_str()))
            .collect()
    }
}

/// The server part of a user id (`@user:server` -> `server`).
fn server_of(user_id: &str) -> Option<&str> {
    user_id.split_once(':').map(|(_, server)| server).filter(|s| !s.is_empty())
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|v| !v.is_empty()).map(str::to_string)
}

impl RoomStateReducer for RoomState {
    fn update_on_event(&mut self, event: &Event, initial: bool) {
        // Live messages never carry room metadata; only state events count.
        if !initial && !event.is_state() {
            return;
        }

        match event.kind() {
            EventKind::Name => self.name = non_empty(event.content_str("name")),
            EventKind::CanonicalAlias => {
                self.canonical_alias = non_empty(event.content_str("alias"))
            }
            EventKind::Aliases => {
                self.aliases = event
                    .content
                    .get("aliases")
                    .and_then(|v| v.as_array())
                    .map(|list| {
                        list.iter()
                            .filter_map(|a| a.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
            }
            EventKind::Topic => {
                self.topic = event.content_str("topic").unwrap_or_default().to_string()
            }
            EventKind::Avatar => {
                self.avatar = event.content_str("url").and_then(|url| MxcUrl::parse(url).ok())
            }
            EventKind::Member => self.apply_member(event),
            _ => return,
        }

        if !initial {
            debug!(event_id = %event.event_id, kind = %event.event_type, "room state updated");
        }
    }

    fn calculate_name(&self, room_id: &RoomId) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(alias) = &self.canonical_alias {
            return alias.clone();
        }
        if let Some(alias) = self.aliases.first() {
            return alias.clone();
        }

        match self.joined_names().as_slice() {
            [] => room_id.to_string(),
            [only] => only.to_string(),
            [a, b] => format!("{a} and {b}"),
            [first, rest @ ..] => format!("{first} and {} others", rest.len()),
        }
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn avatar(&self) -> Option<&MxcUrl> {
        self.avatar.as_ref()
    }

    fn num_member_events(&self) -> usize {
        self.members.len()
    }

    fn num_members(&self) -> usize {
        self.members.values().filter(|m| m.is_joined()).count()
    }

    fn servers(&self) -> BTreeSet<String> {
        self.members
            .iter()
            .filter(|(_, m)| m.is_joined())
            .filter_map(|(user_id, _)| server_of(user_id))
            .map(str::to_string)
            .collect()
    }
}
