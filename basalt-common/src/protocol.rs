//! Control-protocol types
//!
//! The partial-update payload a client PATCHes onto a player, and the
//! snapshot the node reports back. Every update field is independently
//! absent, explicitly null, or present-with-value; that tri-state is
//! load-bearing (absent means "leave alone", null means "clear") and is
//! carried by [`Omissible`] rather than a plain `Option`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::filters::FilterSpec;
use crate::track::TrackInfo;

/// Tri-state wrapper for partial-update fields
///
/// `#[serde(default, skip_serializing_if = "Omissible::is_omitted")]` on the
/// owning field gives the full absent / null / value distinction on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Omissible<T> {
    /// Field absent from the payload: leave the current value alone
    #[default]
    Omitted,
    /// Field present with explicit null: clear / reset
    Null,
    /// Field present with a value
    Present(T),
}

impl<T> Omissible<T> {
    pub fn is_omitted(&self) -> bool {
        matches!(self, Omissible::Omitted)
    }

    /// Whether the field appeared in the payload at all (null counts)
    pub fn is_present(&self) -> bool {
        !self.is_omitted()
    }

    /// The carried value, if any (null and absent both map to `None`)
    pub fn value(&self) -> Option<&T> {
        match self {
            Omissible::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Omissible::Present(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Omissible<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Omissible::Present(v),
            None => Omissible::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Omissible<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only reached when the field is present; serde's field default
        // covers the absent case.
        Option::<T>::deserialize(deserializer).map(Omissible::from)
    }
}

impl<T: Serialize> Serialize for Omissible<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Omissible::Present(v) => serializer.serialize_some(v),
            _ => serializer.serialize_none(),
        }
    }
}

/// Voice-server descriptor as pushed by the client's voice backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    /// Voice token for the guild
    pub token: String,
    /// Voice gateway endpoint host
    pub endpoint: String,
    /// Voice session identifier
    pub session_id: String,
}

impl VoiceState {
    /// A descriptor with any blank component is a known partial/no-op push
    /// from the voice backend, not a usable connection target.
    pub fn is_partial(&self) -> bool {
        self.token.is_empty() || self.endpoint.is_empty() || self.session_id.is_empty()
    }
}

/// Partial player update (PATCH body)
///
/// Field interaction rules live in the node's update handler; this type only
/// preserves what the client actually sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    /// Opaque encoded track to play; explicit null stops the current track
    #[serde(default, skip_serializing_if = "Omissible::is_omitted")]
    pub encoded_track: Omissible<String>,

    /// Free-form identifier to resolve into a track
    #[serde(default, skip_serializing_if = "Omissible::is_omitted")]
    pub identifier: Omissible<String>,

    /// Playback position in milliseconds
    #[serde(default, skip_serializing_if = "Omissible::is_omitted")]
    pub position: Omissible<u64>,

    /// End marker in milliseconds; explicit null clears the marker
    #[serde(default, skip_serializing_if = "Omissible::is_omitted")]
    pub end_time: Omissible<u64>,

    /// Volume, 0..=1000
    #[serde(default, skip_serializing_if = "Omissible::is_omitted")]
    pub volume: Omissible<u16>,

    /// Pause flag
    #[serde(default, skip_serializing_if = "Omissible::is_omitted")]
    pub paused: Omissible<bool>,

    /// Replacement filter chain spec
    #[serde(default, skip_serializing_if = "Omissible::is_omitted")]
    pub filters: Omissible<FilterSpec>,

    /// Voice-server descriptor update
    #[serde(default, skip_serializing_if = "Omissible::is_omitted")]
    pub voice: Omissible<VoiceState>,
}

impl PlayerUpdate {
    /// Whether this update starts (or stops) a track
    ///
    /// An explicit `encodedTrack: null` counts: it suppresses the standalone
    /// position/endTime/paused steps exactly like a real replacement does.
    pub fn requests_track_change(&self) -> bool {
        self.encoded_track.is_present() || self.identifier.is_present()
    }
}

/// Externally observable player lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// No track loaded
    Idle,
    /// Track resolution in flight
    Loading,
    /// Track playing
    Playing,
    /// Track loaded, playback paused
    Paused,
    /// Current track ended; player persists
    Stopped,
}

/// Track portion of a player snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSnapshot {
    /// Opaque round-trippable form
    pub encoded: String,
    /// Decoded metadata
    pub info: TrackInfo,
}

/// Voice-connection portion of a player snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceStatus {
    /// Whether a live transport is currently bound and open
    pub connected: bool,
    /// Last transport round-trip time in milliseconds, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_ms: Option<u64>,
}

/// Externally observable serialized state of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub guild_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackSnapshot>,
    pub state: PlayerState,
    /// Playback position in milliseconds
    pub position: u64,
    pub volume: u16,
    pub paused: bool,
    /// The validated filter spec currently in force (not the built stages)
    pub filters: FilterSpec,
    pub voice: VoiceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default)]
        field: Omissible<u64>,
    }

    #[test]
    fn test_omissible_absent() {
        let p: Probe = serde_json::from_str("{}").unwrap();
        assert_eq!(p.field, Omissible::Omitted);
    }

    #[test]
    fn test_omissible_null() {
        let p: Probe = serde_json::from_str(r#"{"field": null}"#).unwrap();
        assert_eq!(p.field, Omissible::Null);
    }

    #[test]
    fn test_omissible_value() {
        let p: Probe = serde_json::from_str(r#"{"field": 42}"#).unwrap();
        assert_eq!(p.field, Omissible::Present(42));
    }

    #[test]
    fn test_update_distinguishes_null_track_from_absent() {
        let stop: PlayerUpdate = serde_json::from_str(r#"{"encodedTrack": null}"#).unwrap();
        assert_eq!(stop.encoded_track, Omissible::Null);
        assert!(stop.requests_track_change());

        let noop: PlayerUpdate = serde_json::from_str("{}").unwrap();
        assert!(noop.encoded_track.is_omitted());
        assert!(!noop.requests_track_change());
    }

    #[test]
    fn test_update_parses_camel_case_fields() {
        let update: PlayerUpdate = serde_json::from_str(
            r#"{"identifier": "abc", "endTime": 3000, "paused": true}"#,
        )
        .unwrap();
        assert_eq!(update.identifier, Omissible::Present("abc".to_string()));
        assert_eq!(update.end_time, Omissible::Present(3000));
        assert_eq!(update.paused, Omissible::Present(true));
        assert!(update.position.is_omitted());
    }

    #[test]
    fn test_partial_voice_state() {
        let voice = VoiceState {
            token: "tok".to_string(),
            endpoint: String::new(),
            session_id: "sess".to_string(),
        };
        assert!(voice.is_partial());

        let full = VoiceState {
            token: "tok".to_string(),
            endpoint: "voice.example.com".to_string(),
            session_id: "sess".to_string(),
        };
        assert!(!full.is_partial());
    }

    #[test]
    fn test_omitted_fields_are_skipped_on_serialize() {
        let update = PlayerUpdate {
            volume: Omissible::Present(250),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"volume": 250}));
    }
}
