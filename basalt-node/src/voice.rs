//! Voice connection management
//!
//! Owns the at-most-one-per-guild binding to the voice gateway and
//! reconciles desired vs. actual connection state. A descriptor that
//! disagrees with the live connection (different endpoint/token/session, or
//! a closed transport) forces teardown-then-recreate; a live transport is
//! never mutated in place.
//!
//! Callers serialize reconcile/destroy per guild (the player command queue
//! does this); the internal lock only guards the map, never a connect
//! round trip, so one guild's slow handshake cannot stall another's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use basalt_common::protocol::{VoiceState, VoiceStatus};

use crate::error::{Error, Result};

/// Live transport handle for one guild
///
/// The real-time media path (encryption, RTP framing) lives behind this
/// trait; the node only observes liveness and hands tracks over.
pub trait VoiceTransport: Send + Sync {
    /// Whether the transport is currently usable
    fn is_open(&self) -> bool;

    /// Last observed round-trip time, when the transport measures one
    fn ping_ms(&self) -> Option<u64>;

    /// Hand an encoded track to the media path
    fn submit_track(&self, encoded_track: &str);

    /// Close the transport; further `is_open` calls return false
    fn close(&self);
}

/// Client for the external voice gateway
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Establish a transport for a guild using the given descriptor
    async fn connect(
        &self,
        guild_id: &str,
        descriptor: &VoiceState,
    ) -> Result<Arc<dyn VoiceTransport>>;

    /// Release any gateway-side state for a guild (idempotent)
    async fn destroy(&self, guild_id: &str);
}

struct VoiceConnection {
    descriptor: VoiceState,
    transport: Arc<dyn VoiceTransport>,
}

/// Per-session connection reconciler, keyed by guild id
pub struct VoiceConnectionManager {
    gateway: Arc<dyn VoiceGateway>,
    connections: Mutex<HashMap<String, VoiceConnection>>,
    connect_timeout: Duration,
}

impl VoiceConnectionManager {
    pub fn new(gateway: Arc<dyn VoiceGateway>, connect_timeout: Duration) -> Self {
        Self {
            gateway,
            connections: Mutex::new(HashMap::new()),
            connect_timeout,
        }
    }

    /// Bring the guild's connection in line with the descriptor
    ///
    /// Identical descriptor + open transport is a no-op returning the live
    /// transport. Anything else destroys the old connection first, then
    /// establishes a fresh one, bounded by the connect timeout.
    pub async fn reconcile(
        &self,
        guild_id: &str,
        descriptor: &VoiceState,
    ) -> Result<Arc<dyn VoiceTransport>> {
        let stale = {
            let mut connections = self.connections.lock().await;
            match connections.get(guild_id) {
                Some(existing)
                    if existing.descriptor == *descriptor && existing.transport.is_open() =>
                {
                    debug!("Voice descriptor unchanged for guild {}, keeping connection", guild_id);
                    return Ok(existing.transport.clone());
                }
                Some(_) => connections.remove(guild_id),
                None => None,
            }
        };

        if let Some(stale) = stale {
            info!("Voice descriptor changed for guild {}, tearing down old connection", guild_id);
            stale.transport.close();
            self.gateway.destroy(guild_id).await;
        }

        let transport = tokio::time::timeout(
            self.connect_timeout,
            self.gateway.connect(guild_id, descriptor),
        )
        .await
        .map_err(|_| Error::Timeout(format!("voice connection for guild {}", guild_id)))??;

        info!("Voice connection established for guild {}", guild_id);
        let mut connections = self.connections.lock().await;
        connections.insert(
            guild_id.to_string(),
            VoiceConnection {
                descriptor: descriptor.clone(),
                transport: transport.clone(),
            },
        );
        Ok(transport)
    }

    /// Tear down the guild's connection, if any (idempotent)
    pub async fn destroy(&self, guild_id: &str) {
        let removed = self.connections.lock().await.remove(guild_id);
        if let Some(connection) = removed {
            info!("Destroying voice connection for guild {}", guild_id);
            connection.transport.close();
        }
        // Gateway-side release is idempotent too, so always forward
        self.gateway.destroy(guild_id).await;
    }

    /// Tear down every connection this manager owns
    pub async fn destroy_all(&self) {
        let guild_ids: Vec<String> = self.connections.lock().await.keys().cloned().collect();
        for guild_id in guild_ids {
            self.destroy(&guild_id).await;
        }
    }

    /// Live transport for a guild, if one is bound
    pub async fn transport(&self, guild_id: &str) -> Option<Arc<dyn VoiceTransport>> {
        self.connections
            .lock()
            .await
            .get(guild_id)
            .map(|c| c.transport.clone())
    }

    /// Observable connection state for snapshots
    pub async fn status(&self, guild_id: &str) -> VoiceStatus {
        match self.connections.lock().await.get(guild_id) {
            Some(connection) if connection.transport.is_open() => VoiceStatus {
                connected: true,
                ping_ms: connection.transport.ping_ms(),
            },
            _ => VoiceStatus::default(),
        }
    }
}

/// In-process stand-in for a real voice gateway client
///
/// Accepts every descriptor and produces a transport that stays open until
/// closed. Deployments wire a real RTP client behind [`VoiceGateway`]
/// instead; this keeps the node runnable and the tests deterministic.
pub struct LoopbackGateway;

#[async_trait]
impl VoiceGateway for LoopbackGateway {
    async fn connect(
        &self,
        guild_id: &str,
        descriptor: &VoiceState,
    ) -> Result<Arc<dyn VoiceTransport>> {
        debug!(
            "Loopback voice connect for guild {} to {}",
            guild_id, descriptor.endpoint
        );
        Ok(Arc::new(LoopbackTransport {
            open: AtomicBool::new(true),
        }))
    }

    async fn destroy(&self, _guild_id: &str) {}
}

/// Transport produced by [`LoopbackGateway`]
pub struct LoopbackTransport {
    open: AtomicBool,
}

impl VoiceTransport for LoopbackTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn ping_ms(&self) -> Option<u64> {
        Some(0)
    }

    fn submit_track(&self, encoded_track: &str) {
        if !self.is_open() {
            warn!("Track submitted to a closed loopback transport");
            return;
        }
        debug!("Loopback transport accepted track ({} bytes)", encoded_track.len());
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}
