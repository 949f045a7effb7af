//! Track metadata and the opaque track codec
//!
//! A track travels between clients and the node as an opaque encoded string.
//! The encoding is a versioned JSON envelope wrapped in standard base64, so
//! any client that stored an encoded track can hand it back verbatim and get
//! the identical metadata out again.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current codec envelope version
const CODEC_VERSION: u8 = 1;

/// Decoded track metadata
///
/// Everything here is immutable once resolved; runtime state (position,
/// end marker) lives on the player side, not in the encoded form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    /// Source-scoped identifier (URL, video id, file path, ...)
    pub identifier: String,
    /// Display title
    pub title: String,
    /// Author / uploader / artist
    pub author: String,
    /// Track length in milliseconds (0 when unknown)
    pub length_ms: u64,
    /// Whether seeking within the track is supported
    pub is_seekable: bool,
    /// Whether this is a live stream (no defined end)
    pub is_stream: bool,
    /// Original URI, if the source has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Artwork URL, if the source exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    /// Name of the source provider that resolved this track
    pub source_name: String,
}

/// Versioned envelope for the encoded form
#[derive(Serialize, Deserialize)]
struct TrackEnvelope {
    version: u8,
    info: TrackInfo,
}

/// Errors from encoding or decoding opaque tracks
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid base64 in encoded track: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("malformed encoded track payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported track codec version: {0}")]
    UnsupportedVersion(u8),
}

/// Encode track metadata into the opaque wire form
pub fn encode_track(info: &TrackInfo) -> String {
    let envelope = TrackEnvelope {
        version: CODEC_VERSION,
        info: info.clone(),
    };
    // TrackInfo contains no non-serializable values, so this cannot fail
    let json = serde_json::to_vec(&envelope).unwrap_or_default();
    BASE64.encode(json)
}

/// Decode an opaque track back into its metadata
pub fn decode_track(encoded: &str) -> Result<TrackInfo, CodecError> {
    let bytes = BASE64.decode(encoded.trim())?;
    let envelope: TrackEnvelope = serde_json::from_slice(&bytes)?;
    if envelope.version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion(envelope.version));
    }
    Ok(envelope.info)
}
