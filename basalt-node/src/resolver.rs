//! Track resolution
//!
//! Turns an opaque encoded reference or a free-form identifier into exactly
//! one track, or a classified failure. Providers are asked in registration
//! order; the first one that claims an identifier resolves it. Resolution is
//! bounded by a timeout so a hung provider cannot wedge a player's update
//! queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use basalt_common::track::{decode_track, TrackInfo};

use crate::error::{Error, Result};

/// What an identifier resolved to
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// Exactly one track
    Track(TrackInfo),
    /// An ordered collection of tracks
    Playlist { name: String, tracks: Vec<TrackInfo> },
    /// Multiple search matches
    Search(Vec<TrackInfo>),
    /// Nothing matched
    Empty,
}

/// A site that can resolve identifiers into playable tracks
#[async_trait]
pub trait AudioSourceProvider: Send + Sync {
    /// Stable provider name, recorded in resolved track metadata
    fn name(&self) -> &str;

    /// Whether this provider wants to handle the identifier
    fn can_resolve(&self, identifier: &str) -> bool;

    /// Resolve the identifier; backend failures use `Error::SourceBackend`
    async fn resolve(&self, identifier: &str) -> Result<LoadOutcome>;
}

/// Composes registered source providers into one resolution entry point
pub struct TrackResolver {
    providers: Vec<Arc<dyn AudioSourceProvider>>,
    resolve_timeout: Duration,
}

impl TrackResolver {
    pub fn new(providers: Vec<Arc<dyn AudioSourceProvider>>, resolve_timeout: Duration) -> Self {
        Self {
            providers,
            resolve_timeout,
        }
    }

    /// Full resolution outcome for an identifier (load endpoint semantics:
    /// playlists and search results are reported, not rejected)
    pub async fn load(&self, identifier: &str) -> Result<LoadOutcome> {
        for provider in &self.providers {
            if !provider.can_resolve(identifier) {
                continue;
            }
            debug!("Resolving {:?} via provider {}", identifier, provider.name());
            return tokio::time::timeout(self.resolve_timeout, provider.resolve(identifier))
                .await
                .map_err(|_| Error::Timeout(format!("resolution of {:?}", identifier)))?;
        }
        Ok(LoadOutcome::Empty)
    }

    /// Resolve an identifier to exactly one track
    ///
    /// The player-update surface plays one track per request, never a
    /// collection, so any multi-result outcome is a classified error here.
    pub async fn resolve_single(&self, identifier: &str) -> Result<TrackInfo> {
        match self.load(identifier).await? {
            LoadOutcome::Track(info) => Ok(info),
            LoadOutcome::Playlist { name, tracks } => Err(Error::Ambiguous(format!(
                "identifier resolved to playlist {:?} ({} tracks); one track per request",
                name,
                tracks.len()
            ))),
            LoadOutcome::Search(matches) => Err(Error::Ambiguous(format!(
                "identifier produced {} search matches; one track per request",
                matches.len()
            ))),
            LoadOutcome::Empty => Err(Error::NoMatches(identifier.to_string())),
        }
    }

    /// Decode an opaque encoded track reference
    pub fn resolve_encoded(&self, encoded: &str) -> Result<TrackInfo> {
        decode_track(encoded).map_err(|e| Error::TrackDecode(e.to_string()))
    }
}

/// Direct-URL source provider
///
/// Claims plain `http(s)` identifiers and probes them with a HEAD request.
/// Duration is unknown for bare URLs, so tracks resolve as unseekable
/// streams.
pub struct HttpSourceProvider {
    client: reqwest::Client,
}

impl HttpSourceProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn title_for(url: &str) -> String {
        url.rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(url)
            .to_string()
    }
}

impl Default for HttpSourceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSourceProvider for HttpSourceProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn can_resolve(&self, identifier: &str) -> bool {
        identifier.starts_with("http://") || identifier.starts_with("https://")
    }

    async fn resolve(&self, identifier: &str) -> Result<LoadOutcome> {
        let response = self
            .client
            .head(identifier)
            .send()
            .await
            .map_err(|e| Error::SourceBackend(e.into()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(LoadOutcome::Empty);
        }
        if !response.status().is_success() {
            return Err(Error::SourceBackend(anyhow::anyhow!(
                "HEAD {} returned {}",
                identifier,
                response.status()
            )));
        }

        Ok(LoadOutcome::Track(TrackInfo {
            identifier: identifier.to_string(),
            title: Self::title_for(identifier),
            author: "unknown".to_string(),
            length_ms: 0,
            is_seekable: false,
            is_stream: true,
            uri: Some(identifier.to_string()),
            artwork_url: None,
            source_name: self.name().to_string(),
        }))
    }
}
