//! Strict schema of the persisted `app-configs` blob
//!
//! The blob is a flat JSON object. Keys starting with `@` are presets (with
//! `@default` as the base), `app:`/`class:` keys are exact matches and
//! `regex.app:`/`regex.class:` keys are patterns. Values are either a partial
//! config object or a string naming a preset.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::rules::{
    APP_PREFIX, CLASS_PREFIX, DEFAULT_KEY, PRESET_SIGIL, REGEX_APP_PREFIX, REGEX_CLASS_PREFIX,
};

/// Accepts integer or float pixel values, truncating toward zero
fn deserialize_px<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrFloat {
        Int(i64),
        Float(f64),
    }

    Ok(Option::<IntOrFloat>::deserialize(deserializer)?.map(|v| match v {
        IntOrFloat::Int(i) => i,
        IntOrFloat::Float(f) => f.trunc() as i64,
    }))
}

/// A number applying to every side, or an object setting sides independently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarginsValue {
    Uniform(#[serde(deserialize_with = "deserialize_px_required")] i64),
    Sides(MarginSides),
}

/// A number applying to every corner, or an object setting corners independently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RadiusValue {
    Uniform(#[serde(deserialize_with = "deserialize_px_required")] i64),
    Corners(RadiusCorners),
}

fn deserialize_px_required<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_px(deserializer)?.ok_or_else(|| serde::de::Error::custom("expected a number"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginSides {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_px")]
    pub top: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_px")]
    pub right: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_px")]
    pub bottom: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_px")]
    pub left: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusCorners {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_px")]
    pub tl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_px")]
    pub tr: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_px")]
    pub br: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_px")]
    pub bl: Option<i64>,
}

/// Partial style configuration; unset fields inherit from the base
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximized_border: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_px")]
    pub width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margins: Option<MarginsValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<RadiusValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_color: Option<String>,
    /// Unknown fields are carried through untouched so edits never drop them
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawConfig {
    /// Field-wise overlay: every field set in `self` replaces the one in `base`
    pub fn overlay_on(&self, base: &RawConfig) -> RawConfig {
        let mut extra = base.extra.clone();
        extra.extend(self.extra.clone());
        RawConfig {
            enabled: self.enabled.or(base.enabled),
            maximized_border: self.maximized_border.or(base.maximized_border),
            width: self.width.or(base.width),
            margins: self.margins.clone().or_else(|| base.margins.clone()),
            radius: self.radius.clone().or_else(|| base.radius.clone()),
            active_color: self.active_color.clone().or_else(|| base.active_color.clone()),
            inactive_color: self.inactive_color.clone().or_else(|| base.inactive_color.clone()),
            extra,
        }
    }
}

/// One value in the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    /// Reference to a preset key such as `@gtkPreset`
    Preset(String),
    Config(RawConfig),
}

impl RawEntry {
    pub fn as_config(&self) -> Option<&RawConfig> {
        match self {
            RawEntry::Config(config) => Some(config),
            RawEntry::Preset(_) => None,
        }
    }
}

/// Parsed meaning of a table key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRule<'a> {
    Default,
    Preset(&'a str),
    App(&'a str),
    Class(&'a str),
    RegexApp(&'a str),
    RegexClass(&'a str),
    Unknown,
}

impl<'a> MatchRule<'a> {
    pub fn parse(key: &'a str) -> Self {
        if key == DEFAULT_KEY {
            MatchRule::Default
        } else if key.starts_with(PRESET_SIGIL) {
            MatchRule::Preset(key)
        } else if let Some(pattern) = key.strip_prefix(REGEX_APP_PREFIX) {
            MatchRule::RegexApp(pattern)
        } else if let Some(pattern) = key.strip_prefix(REGEX_CLASS_PREFIX) {
            MatchRule::RegexClass(pattern)
        } else if let Some(id) = key.strip_prefix(APP_PREFIX) {
            MatchRule::App(id)
        } else if let Some(class) = key.strip_prefix(CLASS_PREFIX) {
            MatchRule::Class(class)
        } else {
            MatchRule::Unknown
        }
    }
}

pub fn is_preset_key(key: &str) -> bool {
    key.starts_with(PRESET_SIGIL)
}

/// The whole `app-configs` table, in stored order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawConfigStore {
    pub entries: IndexMap<String, RawEntry>,
}

impl RawConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted blob; an empty string is an empty table
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(json).context("Failed to parse app-configs JSON")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize app-configs to JSON")
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize app-configs to JSON")
    }

    pub fn get(&self, key: &str) -> Option<&RawEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: RawEntry) -> Option<RawEntry> {
        self.entries.insert(key.into(), entry)
    }

    /// Remove preserving the order of the remaining keys
    pub fn remove(&mut self, key: &str) -> Option<RawEntry> {
        self.entries.shift_remove(key)
    }

    /// Raw object of the base config, empty if absent or not an object
    pub fn default_config(&self) -> RawConfig {
        self.entries
            .get(DEFAULT_KEY)
            .and_then(RawEntry::as_config)
            .cloned()
            .unwrap_or_default()
    }

    /// Object stored under a preset key, empty if missing or not an object
    pub fn preset_config(&self, preset: &str) -> RawConfig {
        self.entries
            .get(preset)
            .and_then(RawEntry::as_config)
            .cloned()
            .unwrap_or_default()
    }

    /// Non-preset keys, sorted for display
    pub fn app_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .entries
            .keys()
            .map(String::as_str)
            .filter(|k| !is_preset_key(k))
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Preset keys in stored order
    pub fn preset_keys(&self, include_default: bool) -> Vec<&str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|k| is_preset_key(k) && (include_default || *k != DEFAULT_KEY))
            .collect()
    }

    /// Replace preset references with the referenced raw objects, one level deep
    ///
    /// Unknown references and strings that do not name a preset become empty
    /// overrides. Preset keys themselves are not part of the result.
    pub fn resolve_presets(&self) -> IndexMap<&str, RawConfig> {
        let mut resolved = IndexMap::new();
        for (key, entry) in &self.entries {
            if is_preset_key(key) {
                continue;
            }
            let config = match entry {
                RawEntry::Config(config) => config.clone(),
                RawEntry::Preset(reference) => match self.entries.get(reference) {
                    Some(RawEntry::Config(preset)) if is_preset_key(reference) => preset.clone(),
                    _ => {
                        warn!(key = %key, preset = %reference, "Unknown preset reference");
                        RawConfig::default()
                    }
                },
            };
            resolved.insert(key.as_str(), config);
        }
        resolved
    }
}
