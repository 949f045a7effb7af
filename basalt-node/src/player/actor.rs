//! Player actor task
//!
//! Owns all mutable state for one guild's player and processes commands
//! strictly in arrival order. A position clock ticks alongside the command
//! queue to advance playback, fire end markers, and emit periodic state
//! updates.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use basalt_common::events::{SessionEvent, TrackEndReason};
use basalt_common::protocol::{
    Omissible, PlayerSnapshot, PlayerState, PlayerUpdate, TrackSnapshot,
};
use basalt_common::time;
use basalt_common::track::{encode_track, TrackInfo};

use crate::error::{Error, Result};
use crate::filters::{build_chain, FilterChain, PcmFormat};
use crate::player::{PlayerCommand, PlayerContext};

use basalt_common::filters::FilterSpec;

/// Maximum accepted volume value
const MAX_VOLUME: u16 = 1000;

/// One-shot playback marker
///
/// Fires when the position clock reaches `at`, ending the current track,
/// then clears itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackMarker {
    pub at: Duration,
}

/// The track currently owned by a player, with its runtime state
struct CurrentTrack {
    encoded: String,
    info: TrackInfo,
    position: Duration,
    marker: Option<TrackMarker>,
}

pub(super) fn spawn(
    guild_id: String,
    ctx: PlayerContext,
    rx: mpsc::Receiver<PlayerCommand>,
) {
    let actor = PlayerActor {
        guild_id,
        ctx,
        track: None,
        state: PlayerState::Idle,
        filters: FilterSpec::default(),
        chain: FilterChain::identity(),
        volume: 100,
        paused: false,
        voice_lost: false,
        last_tick: Instant::now(),
        last_periodic_emit: Instant::now(),
    };
    tokio::spawn(actor.run(rx));
}

struct PlayerActor {
    guild_id: String,
    ctx: PlayerContext,
    track: Option<CurrentTrack>,
    state: PlayerState,
    filters: FilterSpec,
    chain: FilterChain,
    volume: u16,
    paused: bool,
    voice_lost: bool,
    last_tick: Instant,
    last_periodic_emit: Instant,
}

impl PlayerActor {
    async fn run(mut self, mut rx: mpsc::Receiver<PlayerCommand>) {
        debug!(
            "Player task started for guild {} (session {})",
            self.guild_id, self.ctx.session_id
        );
        let mut ticker = interval(self.ctx.config.position_tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(PlayerCommand::Update { update, no_replace, reply }) => {
                        let result = self.apply_update(update, no_replace).await;
                        let _ = reply.send(result);
                    }
                    Some(PlayerCommand::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot().await);
                    }
                    Some(PlayerCommand::Destroy { reply }) => {
                        self.teardown().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                _ = ticker.tick() => self.on_tick().await,
            }
        }
        debug!("Player task stopped for guild {}", self.guild_id);
    }

    // ------------------------------------------------------------------
    // Update protocol
    // ------------------------------------------------------------------

    /// Validate, then apply a partial update in the fixed field-interaction
    /// order. Validation failures reject the whole update with zero side
    /// effects; failures mid-application abort the remaining steps without
    /// rolling back what already happened.
    async fn apply_update(
        &mut self,
        update: PlayerUpdate,
        no_replace: bool,
    ) -> Result<PlayerSnapshot> {
        self.validate(&update)?;

        let track_change = update.requests_track_change();

        // Step 1: voice descriptor. Must settle before any playback step,
        // since a track cannot be handed to an unbound connection.
        if let Some(descriptor) = update.voice.value() {
            self.ctx.voice.reconcile(&self.guild_id, descriptor).await?;
            self.voice_lost = false;
            self.emit_snapshot().await;
        }

        // Step 2: pause toggle, unless a track change governs this update
        if !track_change {
            if let Some(&paused) = update.paused.value() {
                self.set_paused(paused);
            }
        }

        // Step 3: volume, independent of track state
        if let Some(&volume) = update.volume.value() {
            self.volume = volume;
        }

        // Step 4: seek; meaningful only with a loaded track and suppressed
        // when a new track starts this update (its own position governs)
        if !track_change {
            if let Some(&position_ms) = update.position.value() {
                if let Some(track) = self.track.as_mut() {
                    track.position = clamp_position(position_ms, &track.info);
                    self.last_tick = Instant::now();
                    self.emit_snapshot().await;
                } else {
                    debug!("Seek ignored for guild {}: no track loaded", self.guild_id);
                }
            }
        }

        // Step 5: end marker replacement (null clears)
        if !track_change {
            match &update.end_time {
                Omissible::Present(end_ms) => {
                    if let Some(track) = self.track.as_mut() {
                        track.marker = Some(TrackMarker {
                            at: time::millis_to_duration(*end_ms),
                        });
                    }
                }
                Omissible::Null => {
                    if let Some(track) = self.track.as_mut() {
                        track.marker = None;
                    }
                }
                Omissible::Omitted => {}
            }
        }

        // Step 6: wholesale filter chain replacement
        if let Some(spec) = update.filters.value() {
            self.chain = build_chain(spec, &self.ctx.extensions, &PcmFormat::default());
            self.filters = spec.clone();
            self.emit_snapshot().await;
        }

        // Step 7: track change
        if track_change {
            self.apply_track_change(&update, no_replace).await?;
        }

        // Step 8: one final emission covering everything applied
        let snapshot = self.snapshot().await;
        self.emit(SessionEvent::PlayerUpdated {
            snapshot: snapshot.clone(),
            timestamp: time::now(),
        });
        Ok(snapshot)
    }

    /// Pre-mutation validation of the whole payload
    fn validate(&self, update: &PlayerUpdate) -> Result<()> {
        if update.encoded_track.is_present() && update.identifier.is_present() {
            return Err(Error::Validation(
                "encodedTrack and identifier are mutually exclusive".to_string(),
            ));
        }
        if update.identifier == Omissible::Null {
            return Err(Error::Validation("identifier must not be null".to_string()));
        }
        match &update.filters {
            Omissible::Null => {
                return Err(Error::Validation("filters must not be null".to_string()));
            }
            Omissible::Present(spec) => {
                let rejected = spec.validate(&self.ctx.config.disabled_filters);
                if !rejected.is_empty() {
                    return Err(Error::Validation(format!(
                        "filters are disabled on this node: {}",
                        rejected.join(", ")
                    )));
                }
            }
            Omissible::Omitted => {}
        }
        match &update.voice {
            Omissible::Null => {
                return Err(Error::Validation("voice must not be null".to_string()));
            }
            // A blank component is a known partial push from the voice
            // backend, distinct from a teardown (which is an absent field)
            Omissible::Present(descriptor) if descriptor.is_partial() => {
                return Err(Error::Validation(
                    "voice update with empty endpoint, token, or sessionId".to_string(),
                ));
            }
            _ => {}
        }
        match update.end_time {
            Omissible::Present(0) => {
                return Err(Error::Validation(
                    "endTime must be greater than zero".to_string(),
                ));
            }
            _ => {}
        }
        match update.volume {
            Omissible::Null => {
                return Err(Error::Validation("volume must not be null".to_string()));
            }
            Omissible::Present(volume) if volume > MAX_VOLUME => {
                return Err(Error::Validation(format!(
                    "volume must be within 0..={}",
                    MAX_VOLUME
                )));
            }
            _ => {}
        }
        if update.position == Omissible::Null {
            return Err(Error::Validation("position must not be null".to_string()));
        }
        if update.paused == Omissible::Null {
            return Err(Error::Validation("paused must not be null".to_string()));
        }
        Ok(())
    }

    /// Steps 7a-7e: replace, stop, or start the current track
    async fn apply_track_change(&mut self, update: &PlayerUpdate, no_replace: bool) -> Result<()> {
        // 7a: no-replace guard
        if no_replace && self.track.is_some() {
            debug!(
                "noReplace set and guild {} already has a track; keeping it",
                self.guild_id
            );
            return Ok(());
        }

        // 7b: the update's pause flag applies to the new track (default:
        // unpaused). Held until the track is actually accepted so a failed
        // resolve or decode leaves the flag and state in agreement.
        let paused = update.paused.value().copied().unwrap_or(false);

        // 7c: resolve
        let info = match (&update.encoded_track, &update.identifier) {
            (Omissible::Null, _) => {
                // Explicit stop
                self.paused = paused;
                self.end_current(TrackEndReason::Stopped, PlayerState::Idle);
                return Ok(());
            }
            (Omissible::Present(encoded), _) => {
                // Decode before discarding anything so a bad reference
                // leaves the player untouched
                let info = self.ctx.resolver.resolve_encoded(encoded)?;
                self.end_current(TrackEndReason::Replaced, PlayerState::Idle);
                info
            }
            (_, Omissible::Present(identifier)) => {
                self.end_current(TrackEndReason::Replaced, PlayerState::Idle);
                self.state = PlayerState::Loading;
                match self.ctx.resolver.resolve_single(identifier).await {
                    Ok(info) => info,
                    Err(e) => {
                        self.state = PlayerState::Idle;
                        return Err(e);
                    }
                }
            }
            // requests_track_change() guarantees one of the arms above
            _ => unreachable!("track change without a track field"),
        };

        // 7d: position and end marker from this same update apply to the
        // new track, overriding anything steps 2-5 skipped
        let position = clamp_position(update.position.value().copied().unwrap_or(0), &info);
        let marker = update.end_time.value().map(|&end_ms| TrackMarker {
            at: time::millis_to_duration(end_ms),
        });
        let encoded = match &update.encoded_track {
            Omissible::Present(encoded) => encoded.clone(),
            _ => encode_track(&info),
        };

        // 7e: begin playback and hand the track to the bound connection
        let current = CurrentTrack {
            encoded,
            info,
            position,
            marker,
        };
        if let Some(transport) = self.ctx.voice.transport(&self.guild_id).await {
            if transport.is_open() {
                transport.submit_track(&current.encoded);
            } else {
                warn!(
                    "Voice transport for guild {} is closed; track will not be transmitted",
                    self.guild_id
                );
            }
        }
        info!(
            "Guild {} now playing {:?} ({})",
            self.guild_id, current.info.title, current.info.source_name
        );
        self.emit(SessionEvent::TrackStarted {
            guild_id: self.guild_id.clone(),
            track: current.info.clone(),
            timestamp: time::now(),
        });
        self.paused = paused;
        self.track = Some(current);
        self.state = if self.paused {
            PlayerState::Paused
        } else {
            PlayerState::Playing
        };
        self.last_tick = Instant::now();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Position clock
    // ------------------------------------------------------------------

    async fn on_tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;

        if self.state != PlayerState::Playing {
            return;
        }
        if self.track.is_none() {
            return;
        }

        // Report a transport that closed under us, once per loss
        if !self.voice_lost {
            if let Some(transport) = self.ctx.voice.transport(&self.guild_id).await {
                if !transport.is_open() {
                    warn!("Voice transport closed for guild {} mid-track", self.guild_id);
                    self.voice_lost = true;
                    self.emit(SessionEvent::VoiceConnectionClosed {
                        guild_id: self.guild_id.clone(),
                        timestamp: time::now(),
                    });
                }
            }
        }

        let Some(track) = self.track.as_mut() else {
            return;
        };

        track.position += elapsed;

        // End marker fires once, then is cleared (the clear happens
        // implicitly: the track it belonged to is gone)
        if let Some(marker) = track.marker {
            if track.position >= marker.at {
                debug!(
                    "End marker reached for guild {} at {:?}",
                    self.guild_id, marker.at
                );
                self.end_current(TrackEndReason::Finished, PlayerState::Stopped);
                self.emit_snapshot().await;
                return;
            }
        }

        // Natural end of a finite track
        if !track.info.is_stream && track.info.length_ms > 0 {
            let length = time::millis_to_duration(track.info.length_ms);
            if track.position >= length {
                self.end_current(TrackEndReason::Finished, PlayerState::Stopped);
                self.emit_snapshot().await;
                return;
            }
        }

        if self.last_periodic_emit.elapsed() >= self.ctx.config.player_update_interval() {
            self.last_periodic_emit = Instant::now();
            self.emit_snapshot().await;
        }
    }

    // ------------------------------------------------------------------
    // State helpers
    // ------------------------------------------------------------------

    fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        if self.track.is_some() {
            self.state = if paused {
                PlayerState::Paused
            } else {
                PlayerState::Playing
            };
            // Paused time never counts toward position
            self.last_tick = Instant::now();
        }
    }

    /// End the current track (if any), emit its lifecycle event, and leave
    /// the player in `next_state`
    fn end_current(&mut self, reason: TrackEndReason, next_state: PlayerState) {
        if let Some(track) = self.track.take() {
            self.emit(SessionEvent::TrackEnded {
                guild_id: self.guild_id.clone(),
                track: track.info,
                reason,
                timestamp: time::now(),
            });
        }
        self.state = next_state;
    }

    async fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            guild_id: self.guild_id.clone(),
            track: self.track.as_ref().map(|track| TrackSnapshot {
                encoded: track.encoded.clone(),
                info: track.info.clone(),
            }),
            state: self.state,
            position: self
                .track
                .as_ref()
                .map(|track| track.position.as_millis() as u64)
                .unwrap_or(0),
            volume: self.volume,
            paused: self.paused,
            filters: self.filters.clone(),
            voice: self.ctx.voice.status(&self.guild_id).await,
        }
    }

    async fn emit_snapshot(&self) {
        let snapshot = self.snapshot().await;
        self.emit(SessionEvent::PlayerUpdated {
            snapshot,
            timestamp: time::now(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; the REST response still carries the state
        let _ = self.ctx.events.send(event);
    }

    async fn teardown(&mut self) {
        self.end_current(TrackEndReason::Cleanup, PlayerState::Idle);
        self.ctx.voice.destroy(&self.guild_id).await;
        self.emit(SessionEvent::PlayerDestroyed {
            guild_id: self.guild_id.clone(),
            timestamp: time::now(),
        });
        info!("Player destroyed for guild {}", self.guild_id);
    }
}

/// Clamp a requested position to the track's length (streams and
/// unknown-length tracks accept any position)
fn clamp_position(position_ms: u64, info: &TrackInfo) -> Duration {
    let clamped = if !info.is_stream && info.length_ms > 0 {
        position_ms.min(info.length_ms)
    } else {
        position_ms
    };
    time::millis_to_duration(clamped)
}
