//! Room summary projection and media references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::RoomId;

/// Error parsing an `mxc://` URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MxcUrlError {
    #[error("missing mxc:// scheme: '{0}'")]
    Scheme(String),
    #[error("expected mxc://<server>/<media id>, got '{0}'")]
    Malformed(String),
}

/// A content-repository reference: `mxc://<server>/<media id>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MxcUrl {
    pub server: String,
    pub media_id: String,
}

impl MxcUrl {
    pub fn parse(s: &str) -> Result<Self, MxcUrlError> {
        let rest = s
            .strip_prefix("mxc://")
            .ok_or_else(|| MxcUrlError::Scheme(s.to_string()))?;
        match rest.split_once('/') {
            Some((server, media_id))
                if !server.is_empty() && !media_id.is_empty() && !media_id.contains('/') =>
            {
                Ok(Self {
                    server: server.to_string(),
                    media_id: media_id.to_string(),
                })
            }
            _ => Err(MxcUrlError::Malformed(s.to_string())),
        }
    }
}

impl FromStr for MxcUrl {
    type Err = MxcUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MxcUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mxc://{}/{}", self.server, self.media_id)
    }
}

/// Point-in-time metadata for one room, read off the folded room state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub name: String,
    pub topic: String,
    pub avatar: Option<MxcUrl>,
    /// Distinct `m.room.member` state keys seen, whatever their membership.
    pub num_member_events: usize,
    /// Members currently joined.
    pub num_members: usize,
    /// Distinct homeservers among joined members.
    pub num_servers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mxc_parse() {
        let url = MxcUrl::parse("mxc://matrix.org/AbCdEf").unwrap();
        assert_eq!(url.server, "matrix.org");
        assert_eq!(url.media_id, "AbCdEf");
        assert_eq!(url.to_string(), "mxc://matrix.org/AbCdEf");
    }

    #[test]
    fn test_mxc_rejects_bad_input() {
        assert!(matches!(
            MxcUrl::parse("https://matrix.org/x"),
            Err(MxcUrlError::Scheme(_))
        ));
        assert!(matches!(MxcUrl::parse("mxc://matrix.org"), Err(MxcUrlError::Malformed(_))));
        assert!(matches!(MxcUrl::parse("mxc:///id"), Err(MxcUrlError::Malformed(_))));
        assert!(matches!(MxcUrl::parse("mxc://hs/a/b"), Err(MxcUrlError::Malformed(_))));
    }
}
