//! Per-guild player
//!
//! Each guild's player is an independent sequential task reachable only
//! through its command queue. That gives strict ordering for updates to one
//! guild and full parallelism across guilds, without a global lock. The
//! handle side composes a request/response API on top: callers get their
//! result only after all synchronous validation and asynchronous steps for
//! their update completed.

mod actor;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use basalt_common::events::SessionEvent;
use basalt_common::protocol::{PlayerSnapshot, PlayerUpdate};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filters::ExtensionRegistry;
use crate::resolver::TrackResolver;
use crate::voice::VoiceConnectionManager;

pub use actor::TrackMarker;

/// Capacity of a player's command queue
const COMMAND_QUEUE_DEPTH: usize = 32;

/// Shared collaborators handed to every player of a session
#[derive(Clone)]
pub struct PlayerContext {
    pub session_id: String,
    pub voice: Arc<VoiceConnectionManager>,
    pub resolver: Arc<TrackResolver>,
    pub extensions: Arc<ExtensionRegistry>,
    pub events: broadcast::Sender<SessionEvent>,
    pub config: Arc<Config>,
}

pub(crate) enum PlayerCommand {
    Update {
        update: PlayerUpdate,
        no_replace: bool,
        reply: oneshot::Sender<Result<PlayerSnapshot>>,
    },
    Snapshot {
        reply: oneshot::Sender<PlayerSnapshot>,
    },
    Destroy {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a player's command queue
#[derive(Clone)]
pub struct PlayerHandle {
    guild_id: String,
    tx: mpsc::Sender<PlayerCommand>,
}

impl PlayerHandle {
    /// Create the player and spawn its actor task
    pub fn spawn(guild_id: String, ctx: PlayerContext) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        actor::spawn(guild_id.clone(), ctx, rx);
        Self { guild_id, tx }
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// Apply a partial update; resolves once every step of the update has
    /// completed (or failed)
    pub async fn update(&self, update: PlayerUpdate, no_replace: bool) -> Result<PlayerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::Update {
            update,
            no_replace,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.gone())?
    }

    /// Current externally observable state
    pub async fn snapshot(&self) -> Result<PlayerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| self.gone())
    }

    /// Tear the player down, releasing its voice connection; resolves once
    /// the release is complete
    pub async fn destroy(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::Destroy { reply }).await?;
        rx.await.map_err(|_| self.gone())
    }

    async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| self.gone())
    }

    fn gone(&self) -> Error {
        Error::Internal(format!("player task for guild {} stopped", self.guild_id))
    }
}
