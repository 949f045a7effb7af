//! Sessions and the session registry
//!
//! A session is a client's addressable context: a set of per-guild players,
//! an event channel, and its own voice-connection manager. The registry maps
//! session ids to sessions and is the single entry point every player
//! operation resolves through.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::info;
use uuid::Uuid;

use basalt_common::events::SessionEvent;
use basalt_common::protocol::PlayerSnapshot;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filters::ExtensionRegistry;
use crate::player::{PlayerContext, PlayerHandle};
use crate::resolver::TrackResolver;
use crate::voice::{VoiceConnectionManager, VoiceGateway};

/// Event channel depth per session
const EVENT_CHANNEL_DEPTH: usize = 100;

/// One client's context: players, events, and voice connections
pub struct Session {
    id: String,
    players: RwLock<HashMap<String, PlayerHandle>>,
    voice: Arc<VoiceConnectionManager>,
    resolver: Arc<TrackResolver>,
    extensions: Arc<ExtensionRegistry>,
    event_tx: broadcast::Sender<SessionEvent>,
    config: Arc<Config>,
}

impl Session {
    fn new(
        id: String,
        gateway: Arc<dyn VoiceGateway>,
        resolver: Arc<TrackResolver>,
        extensions: Arc<ExtensionRegistry>,
        config: Arc<Config>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_DEPTH);
        let voice = Arc::new(VoiceConnectionManager::new(
            gateway,
            config.connect_timeout(),
        ));
        Self {
            id,
            players: RwLock::new(HashMap::new()),
            voice,
            resolver,
            extensions,
            event_tx,
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscribe to this session's event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Existing player for a guild, if any
    pub async fn player(&self, guild_id: &str) -> Option<PlayerHandle> {
        self.players.read().await.get(guild_id).cloned()
    }

    /// Player for a guild, created lazily on first use
    pub async fn player_or_create(&self, guild_id: &str) -> PlayerHandle {
        if let Some(handle) = self.player(guild_id).await {
            return handle;
        }
        let mut players = self.players.write().await;
        // Re-check under the write lock: another update for this guild may
        // have won the race
        if let Some(handle) = players.get(guild_id) {
            return handle.clone();
        }
        info!("Creating player for guild {} in session {}", guild_id, self.id);
        let handle = PlayerHandle::spawn(
            guild_id.to_string(),
            PlayerContext {
                session_id: self.id.clone(),
                voice: self.voice.clone(),
                resolver: self.resolver.clone(),
                extensions: self.extensions.clone(),
                events: self.event_tx.clone(),
                config: self.config.clone(),
            },
        );
        players.insert(guild_id.to_string(), handle.clone());
        handle
    }

    /// Snapshots of every player in the session
    pub async fn snapshots(&self) -> Result<Vec<PlayerSnapshot>> {
        let handles: Vec<PlayerHandle> = self.players.read().await.values().cloned().collect();
        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            snapshots.push(handle.snapshot().await?);
        }
        Ok(snapshots)
    }

    /// Destroy a player and release its voice connection
    pub async fn destroy_player(&self, guild_id: &str) -> Result<()> {
        let removed = self.players.write().await.remove(guild_id);
        match removed {
            Some(handle) => handle.destroy().await,
            None => Err(Error::PlayerNotFound(guild_id.to_string())),
        }
    }

    /// Tear down every player in the session
    pub async fn shutdown(&self) {
        let handles: Vec<PlayerHandle> = {
            let mut players = self.players.write().await;
            players.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            // Player teardown releases the guild's voice connection
            let _ = handle.destroy().await;
        }
        info!("Session {} shut down", self.id);
    }
}

/// Maps session ids to sessions
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    gateway: Arc<dyn VoiceGateway>,
    resolver: Arc<TrackResolver>,
    extensions: Arc<ExtensionRegistry>,
    config: Arc<Config>,
}

impl SessionRegistry {
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        resolver: Arc<TrackResolver>,
        extensions: Arc<ExtensionRegistry>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            gateway,
            resolver,
            extensions,
            config,
        }
    }

    pub fn resolver(&self) -> &Arc<TrackResolver> {
        &self.resolver
    }

    /// Resolve a session id; unknown ids are a client-facing not-found
    pub async fn get(&self, session_id: &str) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// Create a session with a fresh id
    pub async fn create(&self) -> Arc<Session> {
        self.create_with_id(Uuid::new_v4().to_string()).await
    }

    /// Create a session with a caller-chosen id (replaces any existing
    /// session under that id after shutting it down)
    pub async fn create_with_id(&self, session_id: String) -> Arc<Session> {
        let session = Arc::new(Session::new(
            session_id.clone(),
            self.gateway.clone(),
            self.resolver.clone(),
            self.extensions.clone(),
            self.config.clone(),
        ));
        let previous = self
            .sessions
            .write()
            .await
            .insert(session_id.clone(), session.clone());
        if let Some(previous) = previous {
            previous.shutdown().await;
        }
        info!("Session {} created", session_id);
        session
    }

    /// Remove a session, tearing down all of its players
    pub async fn remove(&self, session_id: &str) -> Result<()> {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(session) => {
                session.shutdown().await;
                Ok(())
            }
            None => Err(Error::SessionNotFound(session_id.to_string())),
        }
    }
}
