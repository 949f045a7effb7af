//! Filter chain specifications
//!
//! A [`FilterSpec`] is the validated wire form of a player's filter chain:
//! the nine built-in effect configurations plus arbitrary plugin-supplied
//! sections. Building the spec into actual pipeline stages is the node's
//! concern; this module only models and validates the configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Built-in filter names in canonical pipeline order
pub const BUILTIN_FILTER_ORDER: [&str; 9] = [
    "equalizer",
    "karaoke",
    "timescale",
    "tremolo",
    "vibrato",
    "rotation",
    "distortion",
    "channelMix",
    "lowPass",
];

/// Gain adjustment for a single equalizer band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerBand {
    /// Band index, 0..=14
    pub band: u8,
    /// Gain multiplier offset, -0.25 (mute) ..= 1.0
    #[serde(default)]
    pub gain: f64,
}

/// Vocal suppression filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Karaoke {
    pub level: f64,
    pub mono_level: f64,
    pub filter_band: f64,
    pub filter_width: f64,
}

impl Default for Karaoke {
    fn default() -> Self {
        Self {
            level: 1.0,
            mono_level: 1.0,
            filter_band: 220.0,
            filter_width: 100.0,
        }
    }
}

/// Speed / pitch / rate adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timescale {
    pub speed: f64,
    pub pitch: f64,
    pub rate: f64,
}

impl Default for Timescale {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch: 1.0,
            rate: 1.0,
        }
    }
}

/// Volume oscillation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tremolo {
    pub frequency: f64,
    pub depth: f64,
}

impl Default for Tremolo {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            depth: 0.5,
        }
    }
}

/// Pitch oscillation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vibrato {
    pub frequency: f64,
    pub depth: f64,
}

impl Default for Vibrato {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            depth: 0.5,
        }
    }
}

/// Audio rotation across stereo channels ("8D")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rotation {
    pub rotation_hz: f64,
}

/// Waveform distortion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Distortion {
    pub sin_offset: f64,
    pub sin_scale: f64,
    pub cos_offset: f64,
    pub cos_scale: f64,
    pub tan_offset: f64,
    pub tan_scale: f64,
    pub offset: f64,
    pub scale: f64,
}

impl Default for Distortion {
    fn default() -> Self {
        Self {
            sin_offset: 0.0,
            sin_scale: 1.0,
            cos_offset: 0.0,
            cos_scale: 1.0,
            tan_offset: 0.0,
            tan_scale: 1.0,
            offset: 0.0,
            scale: 1.0,
        }
    }
}

/// Stereo channel mixing matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelMix {
    pub left_to_left: f64,
    pub left_to_right: f64,
    pub right_to_left: f64,
    pub right_to_right: f64,
}

impl Default for ChannelMix {
    fn default() -> Self {
        Self {
            left_to_left: 1.0,
            left_to_right: 0.0,
            right_to_left: 0.0,
            right_to_right: 1.0,
        }
    }
}

/// High-frequency suppression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LowPass {
    pub smoothing: f64,
}

impl Default for LowPass {
    fn default() -> Self {
        Self { smoothing: 20.0 }
    }
}

/// Ordered, named set of filter configurations
///
/// Unknown top-level keys are collected into `plugin_filters` and offered to
/// registered filter extensions when the chain is built. An empty spec is the
/// identity chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equalizer: Option<Vec<EqualizerBand>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub karaoke: Option<Karaoke>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timescale: Option<Timescale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<Tremolo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<Vibrato>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distortion: Option<Distortion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_mix: Option<ChannelMix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_pass: Option<LowPass>,

    /// Plugin-supplied sections, keyed by extension name
    #[serde(flatten)]
    pub plugin_filters: BTreeMap<String, serde_json::Value>,
}

impl FilterSpec {
    /// Names of every filter this spec enables, built-ins first in canonical
    /// order, then plugin sections in name order
    pub fn enabled_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if self.equalizer.is_some() {
            names.push("equalizer");
        }
        if self.karaoke.is_some() {
            names.push("karaoke");
        }
        if self.timescale.is_some() {
            names.push("timescale");
        }
        if self.tremolo.is_some() {
            names.push("tremolo");
        }
        if self.vibrato.is_some() {
            names.push("vibrato");
        }
        if self.rotation.is_some() {
            names.push("rotation");
        }
        if self.distortion.is_some() {
            names.push("distortion");
        }
        if self.channel_mix.is_some() {
            names.push("channelMix");
        }
        if self.low_pass.is_some() {
            names.push("lowPass");
        }
        names.extend(self.plugin_filters.keys().map(String::as_str));
        names
    }

    /// Names in this spec that appear in the administratively disabled set
    ///
    /// Non-empty result means the whole spec must be rejected; partial
    /// application of a chain is never allowed.
    pub fn validate(&self, disabled: &[String]) -> Vec<String> {
        self.enabled_names()
            .into_iter()
            .filter(|name| disabled.iter().any(|d| d == name))
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled_names().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_spec_is_identity() {
        let spec = FilterSpec::default();
        assert!(spec.is_empty());
        assert!(spec.validate(&["timescale".to_string()]).is_empty());
    }

    #[test]
    fn test_enabled_names_follow_canonical_order() {
        let spec: FilterSpec = serde_json::from_str(
            r#"{
                "lowPass": {"smoothing": 15.0},
                "equalizer": [{"band": 0, "gain": 0.2}],
                "timescale": {"speed": 1.2}
            }"#,
        )
        .unwrap();
        assert_eq!(spec.enabled_names(), vec!["equalizer", "timescale", "lowPass"]);
    }

    #[test]
    fn test_unknown_sections_become_plugin_filters() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"echo": {"delay": 1.0}, "karaoke": {}}"#).unwrap();
        assert_eq!(spec.enabled_names(), vec!["karaoke", "echo"]);
        assert!(spec.plugin_filters.contains_key("echo"));
    }

    #[test]
    fn test_validate_reports_disabled_names() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"timescale": {"speed": 2.0}, "tremolo": {}}"#).unwrap();
        let disabled = vec!["timescale".to_string(), "echo".to_string()];
        assert_eq!(spec.validate(&disabled), vec!["timescale".to_string()]);
    }

    #[test]
    fn test_config_defaults_fill_missing_parameters() {
        let spec: FilterSpec = serde_json::from_str(r#"{"karaoke": {"level": 0.5}}"#).unwrap();
        let karaoke = spec.karaoke.unwrap();
        assert_eq!(karaoke.level, 0.5);
        assert_eq!(karaoke.filter_band, 220.0);
        assert_eq!(karaoke.filter_width, 100.0);
    }

    #[test]
    fn test_spec_round_trips_through_json() {
        let spec: FilterSpec = serde_json::from_str(
            r#"{"channelMix": {"leftToRight": 0.3}, "custom": {"x": 1}}"#,
        )
        .unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        let back: FilterSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
