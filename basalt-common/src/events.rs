//! Session event types
//!
//! Out-of-band notifications pushed to a session's event stream. Every
//! accepted player mutation ends in exactly one `PlayerUpdated` emission;
//! track lifecycle and connection loss get their own event types so clients
//! can react without diffing snapshots.

use serde::{Deserialize, Serialize};

use crate::protocol::PlayerSnapshot;
use crate::track::TrackInfo;

/// Why a track stopped playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackEndReason {
    /// Reached its natural end or its end marker
    Finished,
    /// Stopped by an explicit null-track update
    Stopped,
    /// Replaced by a new track
    Replaced,
    /// Resolution or handoff failed after the track was accepted
    LoadFailed,
    /// Player or session torn down
    Cleanup,
}

/// Events emitted on a session's event stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    /// Player state snapshot after an applied update (and periodically while
    /// a track is playing)
    PlayerUpdated {
        snapshot: PlayerSnapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track started playing
    TrackStarted {
        guild_id: String,
        track: TrackInfo,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track stopped playing
    TrackEnded {
        guild_id: String,
        track: TrackInfo,
        reason: TrackEndReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A player was destroyed and its connection released
    PlayerDestroyed {
        guild_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The voice transport for a guild closed unexpectedly
    VoiceConnectionClosed {
        guild_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SessionEvent {
    /// Stable event-type string, used as the SSE event name
    pub fn type_str(&self) -> &'static str {
        match self {
            SessionEvent::PlayerUpdated { .. } => "PlayerUpdated",
            SessionEvent::TrackStarted { .. } => "TrackStarted",
            SessionEvent::TrackEnded { .. } => "TrackEnded",
            SessionEvent::PlayerDestroyed { .. } => "PlayerDestroyed",
            SessionEvent::VoiceConnectionClosed { .. } => "VoiceConnectionClosed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_tag_by_type() {
        let event = SessionEvent::PlayerDestroyed {
            guild_id: "1".to_string(),
            timestamp: crate::time::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PlayerDestroyed");
        assert_eq!(json["guildId"], "1");
        assert_eq!(event.type_str(), "PlayerDestroyed");
    }

    #[test]
    fn test_end_reason_wire_form() {
        let json = serde_json::to_string(&TrackEndReason::LoadFailed).unwrap();
        assert_eq!(json, r#""loadFailed""#);
    }
}
