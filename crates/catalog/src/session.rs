//! Join links for an active session, one per participant mode the user may take.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Listed in declaration order: observer, moderator, peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantMode {
    Observer,
    Moderator,
    Peer,
}

impl ParticipantMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantMode::Observer => "observer",
            ParticipantMode::Moderator => "moderator",
            ParticipantMode::Peer => "peer",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ParticipantMode::Observer => "As an Observer",
            ParticipantMode::Moderator => "As a Moderator",
            ParticipantMode::Peer => "As a Peer",
        }
    }
}

impl FromStr for ParticipantMode {
    type Err = JoinError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "observer" => Ok(ParticipantMode::Observer),
            "moderator" => Ok(ParticipantMode::Moderator),
            "peer" => Ok(ParticipantMode::Peer),
            other => Err(JoinError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("invalid session id {0:?}")]
    InvalidSessionId(String),
    #[error("unknown participant mode {0:?}")]
    UnknownMode(String),
    #[error("missing cluster id")]
    MissingCluster,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinLink {
    pub mode: ParticipantMode,
    pub label: &'static str,
    pub url: String,
}

/// Links in observer, moderator, peer order whatever order `modes` comes in;
/// duplicates collapse.
pub fn join_links(cluster_id: &str, sid: &str, modes: &[ParticipantMode]) -> Result<Vec<JoinLink>, JoinError> {
    let cluster_id = cluster_id.trim();
    if cluster_id.is_empty() {
        return Err(JoinError::MissingCluster);
    }
    let sid = Uuid::parse_str(sid.trim()).map_err(|_| JoinError::InvalidSessionId(sid.to_string()))?;
    let mut modes = modes.to_vec();
    modes.sort();
    modes.dedup();
    debug!(cluster = cluster_id, %sid, modes = modes.len(), "session join links");
    Ok(modes
        .into_iter()
        .map(|mode| JoinLink {
            mode,
            label: mode.label(),
            url: format!("/web/cluster/{}/console/session/{}?mode={}", cluster_id, sid.hyphenated(), mode.as_str()),
        })
        .collect())
}
