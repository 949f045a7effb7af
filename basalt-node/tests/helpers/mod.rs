//! Shared test helpers: mock collaborators and node wiring
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use basalt_common::protocol::VoiceState;
use basalt_common::track::TrackInfo;
use basalt_node::config::Config;
use basalt_node::error::{Error, Result};
use basalt_node::filters::ExtensionRegistry;
use basalt_node::resolver::{AudioSourceProvider, LoadOutcome, TrackResolver};
use basalt_node::session::SessionRegistry;
use basalt_node::voice::{VoiceGateway, VoiceTransport};

/// A finite, seekable three-minute track for a given identifier
pub fn track_info(identifier: &str) -> TrackInfo {
    TrackInfo {
        identifier: identifier.to_string(),
        title: identifier.to_string(),
        author: "test author".to_string(),
        length_ms: 180_000,
        is_seekable: true,
        is_stream: false,
        uri: None,
        artwork_url: None,
        source_name: "mock".to_string(),
    }
}

pub fn voice_state(token: &str) -> VoiceState {
    VoiceState {
        token: token.to_string(),
        endpoint: "voice.test.example".to_string(),
        session_id: "voice-sess".to_string(),
    }
}

/// Source provider with programmable outcomes and call counting
///
/// Identifiers without a programmed outcome resolve to a single finite
/// track. An identifier can be gated so its resolution blocks until the
/// test releases it.
pub struct MockProvider {
    pub resolve_calls: AtomicUsize,
    outcomes: Mutex<HashMap<String, LoadOutcome>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            resolve_calls: AtomicUsize::new(0),
            outcomes: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_outcome(&self, identifier: &str, outcome: LoadOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(identifier.to_string(), outcome);
    }

    /// Make resolution of `identifier` wait until the returned gate is
    /// notified
    pub fn gate(&self, identifier: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(identifier.to_string(), gate.clone());
        gate
    }

    pub fn resolve_count(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSourceProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn can_resolve(&self, _identifier: &str) -> bool {
        true
    }

    async fn resolve(&self, identifier: &str) -> Result<LoadOutcome> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(identifier).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let programmed = self.outcomes.lock().unwrap().get(identifier).cloned();
        match programmed {
            Some(outcome) => Ok(outcome),
            None => Ok(LoadOutcome::Track(track_info(identifier))),
        }
    }
}

/// Transport that records every submitted track
pub struct MockTransport {
    open: AtomicBool,
    pub submitted: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

impl VoiceTransport for MockTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn ping_ms(&self) -> Option<u64> {
        Some(42)
    }

    fn submit_track(&self, encoded_track: &str) {
        self.submitted
            .lock()
            .unwrap()
            .push(encoded_track.to_string());
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Gateway that counts connects/destroys and can be told to refuse the
/// next connection attempt
pub struct MockGateway {
    pub connects: AtomicUsize,
    pub destroys: AtomicUsize,
    fail_next: AtomicBool,
    transports: Mutex<Vec<(String, Arc<MockTransport>)>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connects: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
            transports: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_next_connect(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    /// Most recent transport handed out for a guild
    pub fn last_transport(&self, guild_id: &str) -> Option<Arc<MockTransport>> {
        self.transports
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(g, _)| g == guild_id)
            .map(|(_, t)| t.clone())
    }
}

#[async_trait]
impl VoiceGateway for MockGateway {
    async fn connect(
        &self,
        guild_id: &str,
        _descriptor: &VoiceState,
    ) -> Result<Arc<dyn VoiceTransport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Connection("mock gateway refused".to_string()));
        }
        let transport = Arc::new(MockTransport::new());
        self.transports
            .lock()
            .unwrap()
            .push((guild_id.to_string(), transport.clone()));
        Ok(transport)
    }

    async fn destroy(&self, _guild_id: &str) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fully wired node with mock collaborators
pub struct TestHarness {
    pub registry: Arc<SessionRegistry>,
    pub provider: Arc<MockProvider>,
    pub gateway: Arc<MockGateway>,
    pub config: Arc<Config>,
}

pub fn harness() -> TestHarness {
    harness_with_config(Config::default())
}

pub fn harness_with_config(config: Config) -> TestHarness {
    let config = Arc::new(config);
    let provider = MockProvider::new();
    let gateway = MockGateway::new();
    let resolver = Arc::new(TrackResolver::new(
        vec![provider.clone() as Arc<dyn AudioSourceProvider>],
        config.resolve_timeout(),
    ));
    let registry = Arc::new(SessionRegistry::new(
        gateway.clone() as Arc<dyn VoiceGateway>,
        resolver,
        Arc::new(ExtensionRegistry::default()),
        config.clone(),
    ));
    TestHarness {
        registry,
        provider,
        gateway,
        config,
    }
}

/// Percent-encode a query-string value (base64 uses `+` and `=`, which
/// serde_urlencoded would otherwise mangle)
pub fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
