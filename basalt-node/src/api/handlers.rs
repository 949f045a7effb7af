//! HTTP request handlers
//!
//! Implements the REST endpoints for session and player control.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use basalt_common::protocol::{PlayerSnapshot, PlayerUpdate};
use basalt_common::track::{encode_track, TrackInfo};

use crate::api::AppContext;
use crate::error::Result;
use crate::resolver::LoadOutcome;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    session_id: String,
}

#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    players: Vec<PlayerSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    #[serde(rename = "noReplace", default)]
    no_replace: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoadTracksQuery {
    identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct DecodeTrackQuery {
    #[serde(rename = "encodedTrack")]
    encoded_track: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedTrackResponse {
    encoded: String,
    info: TrackInfo,
}

/// Wire form of a resolution outcome
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "loadType", content = "data")]
pub enum LoadTracksResponse {
    Track(EncodedTrackResponse),
    Playlist {
        name: String,
        tracks: Vec<EncodedTrackResponse>,
    },
    Search(Vec<EncodedTrackResponse>),
    Empty,
}

fn encoded_response(info: TrackInfo) -> EncodedTrackResponse {
    EncodedTrackResponse {
        encoded: encode_track(&info),
        info,
    }
}

// ============================================================================
// Session Endpoints
// ============================================================================

/// POST /v1/sessions - Create a session
pub async fn create_session(
    State(ctx): State<AppContext>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = ctx.registry.create().await;
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.id().to_string(),
        }),
    )
}

/// DELETE /v1/sessions/:session_id - Tear down a session and its players
pub async fn delete_session(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Result<StatusCode> {
    ctx.registry.remove(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Player Endpoints
// ============================================================================

/// GET /v1/sessions/:session_id/players - All player snapshots
pub async fn list_players(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Result<Json<PlayersResponse>> {
    let session = ctx.registry.get(&session_id).await?;
    let players = session.snapshots().await?;
    Ok(Json(PlayersResponse { players }))
}

/// GET /v1/sessions/:session_id/players/:guild_id - One player snapshot
pub async fn get_player(
    State(ctx): State<AppContext>,
    Path((session_id, guild_id)): Path<(String, String)>,
) -> Result<Json<PlayerSnapshot>> {
    let session = ctx.registry.get(&session_id).await?;
    let player = session
        .player(&guild_id)
        .await
        .ok_or_else(|| crate::error::Error::PlayerNotFound(guild_id.clone()))?;
    Ok(Json(player.snapshot().await?))
}

/// PATCH /v1/sessions/:session_id/players/:guild_id - Partial player update
///
/// Creates the player lazily on first update for a guild. The response is
/// the resulting snapshot, produced only after every step of the update has
/// completed.
pub async fn update_player(
    State(ctx): State<AppContext>,
    Path((session_id, guild_id)): Path<(String, String)>,
    Query(query): Query<UpdateQuery>,
    Json(update): Json<PlayerUpdate>,
) -> Result<Json<PlayerSnapshot>> {
    let session = ctx.registry.get(&session_id).await?;
    let player = session.player_or_create(&guild_id).await;
    let snapshot = player.update(update, query.no_replace).await?;
    Ok(Json(snapshot))
}

/// DELETE /v1/sessions/:session_id/players/:guild_id - Destroy a player
pub async fn delete_player(
    State(ctx): State<AppContext>,
    Path((session_id, guild_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let session = ctx.registry.get(&session_id).await?;
    session.destroy_player(&guild_id).await?;
    info!("Player deleted for guild {} in session {}", guild_id, session_id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Track Endpoints
// ============================================================================

/// GET /v1/loadtracks?identifier= - Full resolution outcome
///
/// Unlike the player-update path, playlists and search results are reported
/// here rather than rejected, so clients can pick a single track themselves.
pub async fn load_tracks(
    State(ctx): State<AppContext>,
    Query(query): Query<LoadTracksQuery>,
) -> Result<Json<LoadTracksResponse>> {
    let outcome = ctx.registry.resolver().load(&query.identifier).await?;
    let response = match outcome {
        LoadOutcome::Track(info) => LoadTracksResponse::Track(encoded_response(info)),
        LoadOutcome::Playlist { name, tracks } => LoadTracksResponse::Playlist {
            name,
            tracks: tracks.into_iter().map(encoded_response).collect(),
        },
        LoadOutcome::Search(matches) => {
            LoadTracksResponse::Search(matches.into_iter().map(encoded_response).collect())
        }
        LoadOutcome::Empty => LoadTracksResponse::Empty,
    };
    Ok(Json(response))
}

/// GET /v1/decodetrack?encodedTrack= - Decode an opaque track reference
pub async fn decode_track(
    State(ctx): State<AppContext>,
    Query(query): Query<DecodeTrackQuery>,
) -> Result<Json<EncodedTrackResponse>> {
    let info = ctx.registry.resolver().resolve_encoded(&query.encoded_track)?;
    Ok(Json(EncodedTrackResponse {
        encoded: query.encoded_track,
        info,
    }))
}
