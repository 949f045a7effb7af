//! Filter chain building
//!
//! Composes a validated [`FilterSpec`] into the ordered stage list handed to
//! the media path. Built-in filters are instantiated in canonical order,
//! then each registered extension is asked, in registration order, whether
//! it is enabled for its payload. Chains are immutable once built and
//! replaced wholesale on update.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use basalt_common::filters::FilterSpec;

/// PCM format the chain will process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u8,
}

impl Default for PcmFormat {
    fn default() -> Self {
        // Opus voice transport format
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// One configured stage in a built chain
///
/// The stage is a configuration artifact: the media-path collaborator turns
/// it into an actual PCM processor downstream of the previous stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    pub name: String,
    pub config: Value,
}

/// Plugin-supplied filter implementation
///
/// Extensions are registered once at startup and consulted in registration
/// order whenever a chain is built from a spec that carries a section under
/// their name.
pub trait FilterExtension: Send + Sync {
    /// Key this extension owns inside a filter spec
    fn name(&self) -> &str;

    /// Whether the payload under this extension's key actually enables it
    fn is_enabled(&self, payload: &Value) -> bool;

    /// Produce the stage for the payload
    fn build(&self, payload: &Value, format: &PcmFormat) -> FilterStage;
}

/// Registered filter extensions, in registration order
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn FilterExtension>>,
}

impl ExtensionRegistry {
    pub fn new(extensions: Vec<Arc<dyn FilterExtension>>) -> Self {
        Self { extensions }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FilterExtension>> {
        self.extensions.iter()
    }
}

/// Immutable, ordered pipeline configuration built from a spec
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    stages: Vec<FilterStage>,
}

impl FilterChain {
    /// No-op passthrough chain
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }
}

/// Build a chain from a validated spec
///
/// Validation against the disabled set happens before this is called; the
/// builder assumes every named filter is allowed.
pub fn build_chain(
    spec: &FilterSpec,
    extensions: &ExtensionRegistry,
    format: &PcmFormat,
) -> FilterChain {
    let mut stages = Vec::new();

    let mut push = |name: &str, config: Value| {
        stages.push(FilterStage {
            name: name.to_string(),
            config,
        });
    };

    // Built-ins, canonical order
    if let Some(equalizer) = &spec.equalizer {
        push("equalizer", serde_json::to_value(equalizer).unwrap_or(Value::Null));
    }
    if let Some(karaoke) = &spec.karaoke {
        push("karaoke", serde_json::to_value(karaoke).unwrap_or(Value::Null));
    }
    if let Some(timescale) = &spec.timescale {
        push("timescale", serde_json::to_value(timescale).unwrap_or(Value::Null));
    }
    if let Some(tremolo) = &spec.tremolo {
        push("tremolo", serde_json::to_value(tremolo).unwrap_or(Value::Null));
    }
    if let Some(vibrato) = &spec.vibrato {
        push("vibrato", serde_json::to_value(vibrato).unwrap_or(Value::Null));
    }
    if let Some(rotation) = &spec.rotation {
        push("rotation", serde_json::to_value(rotation).unwrap_or(Value::Null));
    }
    if let Some(distortion) = &spec.distortion {
        push("distortion", serde_json::to_value(distortion).unwrap_or(Value::Null));
    }
    if let Some(channel_mix) = &spec.channel_mix {
        push("channelMix", serde_json::to_value(channel_mix).unwrap_or(Value::Null));
    }
    if let Some(low_pass) = &spec.low_pass {
        push("lowPass", serde_json::to_value(low_pass).unwrap_or(Value::Null));
    }

    // Plugin extensions, registration order
    for extension in extensions.iter() {
        if let Some(payload) = spec.plugin_filters.get(extension.name()) {
            if extension.is_enabled(payload) {
                stages.push(extension.build(payload, format));
            } else {
                debug!("Extension {} declined payload, skipping stage", extension.name());
            }
        }
    }

    FilterChain { stages }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestExtension {
        key: &'static str,
    }

    impl FilterExtension for TestExtension {
        fn name(&self) -> &str {
            self.key
        }

        fn is_enabled(&self, payload: &Value) -> bool {
            payload.get("enabled").and_then(Value::as_bool).unwrap_or(true)
        }

        fn build(&self, payload: &Value, _format: &PcmFormat) -> FilterStage {
            FilterStage {
                name: self.key.to_string(),
                config: payload.clone(),
            }
        }
    }

    fn spec(json: &str) -> FilterSpec {
        serde_json::from_str(json).unwrap()
    }

    fn stage_names(chain: &FilterChain) -> Vec<&str> {
        chain.stages().iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_empty_spec_builds_identity_chain() {
        let chain = build_chain(
            &FilterSpec::default(),
            &ExtensionRegistry::default(),
            &PcmFormat::default(),
        );
        assert!(chain.is_identity());
    }

    #[test]
    fn test_builtins_keep_canonical_order_regardless_of_spec_order() {
        let spec = spec(
            r#"{
                "lowPass": {},
                "karaoke": {},
                "equalizer": [{"band": 3, "gain": 0.1}],
                "channelMix": {}
            }"#,
        );
        let chain = build_chain(&spec, &ExtensionRegistry::default(), &PcmFormat::default());
        assert_eq!(
            stage_names(&chain),
            vec!["equalizer", "karaoke", "channelMix", "lowPass"]
        );
    }

    #[test]
    fn test_extensions_follow_builtins_in_registration_order() {
        let registry = ExtensionRegistry::new(vec![
            Arc::new(TestExtension { key: "zeta" }),
            Arc::new(TestExtension { key: "alpha" }),
        ]);
        let spec = spec(r#"{"alpha": {}, "zeta": {}, "tremolo": {}}"#);
        let chain = build_chain(&spec, &registry, &PcmFormat::default());
        // Registration order, not name order
        assert_eq!(stage_names(&chain), vec!["tremolo", "zeta", "alpha"]);
    }

    #[test]
    fn test_disabled_extension_payload_contributes_no_stage() {
        let registry = ExtensionRegistry::new(vec![Arc::new(TestExtension { key: "echo" })]);
        let spec = spec(r#"{"echo": {"enabled": false}}"#);
        let chain = build_chain(&spec, &registry, &PcmFormat::default());
        assert!(chain.is_identity());
    }

    #[test]
    fn test_unregistered_plugin_section_is_ignored_at_build_time() {
        let spec = spec(r#"{"unknown": {"x": 1}, "vibrato": {}}"#);
        let chain = build_chain(&spec, &ExtensionRegistry::default(), &PcmFormat::default());
        assert_eq!(stage_names(&chain), vec!["vibrato"]);
    }
}
