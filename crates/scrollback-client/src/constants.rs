//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Events requested by the initial room sync.
pub const INITIAL_SYNC_LIMIT: usize = 256;

/// Events fetched in the single backward extension made while looking for an
/// anchor that isn't cached yet.
pub const ANCHOR_SEARCH_DEPTH: usize = 100;

/// Extra depth kept past a backward page so that small follow-up requests
/// near the same edge don't each hit the network.
pub const OVERCOMPENSATION: usize = 32;

/// Upper bound on a single fetch round-trip.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
