//! Typed settings storage boundary
//!
//! Every key has a schema type and a default. Stores only persist values
//! that were explicitly written; reads of unwritten keys return the default.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{color, keys};

/// A single persisted value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(i) => write!(f, "{i}"),
            SettingValue::String(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Bool,
    Int,
    String,
}

/// Schema entry for one key
#[derive(Debug, Clone, Copy)]
pub struct SettingSpec {
    pub name: &'static str,
    pub kind: SettingKind,
    default: DefaultValue,
}

#[derive(Debug, Clone, Copy)]
enum DefaultValue {
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl SettingSpec {
    pub fn default_value(&self) -> SettingValue {
        match self.default {
            DefaultValue::Bool(b) => SettingValue::Bool(b),
            DefaultValue::Int(i) => SettingValue::Int(i),
            DefaultValue::Str(s) => SettingValue::String(s.to_string()),
        }
    }

    /// Parse user text into a value of this key's type
    pub fn parse_value(&self, text: &str) -> Result<SettingValue> {
        Ok(match self.kind {
            SettingKind::Bool => SettingValue::Bool(
                text.trim()
                    .parse()
                    .with_context(|| format!("'{}' expects true or false", self.name))?,
            ),
            SettingKind::Int => SettingValue::Int(
                text.trim()
                    .parse()
                    .with_context(|| format!("'{}' expects an integer", self.name))?,
            ),
            SettingKind::String => SettingValue::String(text.to_string()),
        })
    }

    fn check(&self, value: &SettingValue) -> Result<()> {
        let matches = matches!(
            (self.kind, value),
            (SettingKind::Bool, SettingValue::Bool(_))
                | (SettingKind::Int, SettingValue::Int(_))
                | (SettingKind::String, SettingValue::String(_))
        );
        if !matches {
            bail!("Setting '{}' expects a {:?} value, got {value:?}", self.name, self.kind);
        }
        Ok(())
    }
}

const fn spec(name: &'static str, kind: SettingKind, default: DefaultValue) -> SettingSpec {
    SettingSpec { name, kind, default }
}

/// Every known key with its type and default
pub const SCHEMA: &[SettingSpec] = &[
    spec(keys::RADIUS_ENABLED, SettingKind::Bool, DefaultValue::Bool(true)),
    spec(keys::MODAL_ENABLED, SettingKind::Bool, DefaultValue::Bool(true)),
    spec(keys::VERBOSE_LOGGING, SettingKind::Bool, DefaultValue::Bool(false)),
    spec(keys::DEFAULT_ENABLED, SettingKind::Bool, DefaultValue::Bool(true)),
    spec(keys::DEFAULT_MAXIMIZED_BORDERS, SettingKind::Bool, DefaultValue::Bool(false)),
    spec(keys::DEFAULT_WIDTH, SettingKind::Int, DefaultValue::Int(3)),
    spec(keys::DEFAULT_MARGINS, SettingKind::Int, DefaultValue::Int(0)),
    spec(keys::DEFAULT_RADIUS, SettingKind::Int, DefaultValue::Int(0)),
    spec(keys::DEFAULT_ACTIVE_COLOR, SettingKind::String, DefaultValue::Str(color::AUTO)),
    spec(
        keys::DEFAULT_INACTIVE_COLOR,
        SettingKind::String,
        DefaultValue::Str(color::DEFAULT_INACTIVE),
    ),
    spec(keys::APP_CONFIGS, SettingKind::String, DefaultValue::Str("{}")),
    spec(keys::CONFIG_VERSION, SettingKind::Int, DefaultValue::Int(0)),
];

pub fn lookup(name: &str) -> Result<&'static SettingSpec> {
    SCHEMA
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| anyhow!("Unknown setting '{name}'"))
}

/// Read `key`, falling back to its schema default when the stored value is unusable
pub fn read_or_default<S>(settings: &S, key: &str) -> SettingValue
where
    S: SettingsStore + ?Sized,
{
    settings.get(key).unwrap_or_else(|err| {
        warn!(key = %key, error = %err, "Invalid setting value, using default");
        lookup(key)
            .map(SettingSpec::default_value)
            .unwrap_or(SettingValue::Bool(false))
    })
}

/// Typed get/set access to persisted settings
pub trait SettingsStore {
    /// Explicitly stored value of `key`, if any
    fn stored(&self, key: &str) -> Option<SettingValue>;
    /// Persist `value` under `key`
    fn store(&mut self, key: &str, value: SettingValue) -> Result<()>;
    /// The host's system accent-color preference
    fn accent_color(&self) -> Option<String>;

    fn get(&self, key: &str) -> Result<SettingValue> {
        let spec = lookup(key)?;
        match self.stored(key) {
            Some(value) => {
                spec.check(&value)?;
                Ok(value)
            }
            None => Ok(spec.default_value()),
        }
    }

    fn set(&mut self, key: &str, value: SettingValue) -> Result<()> {
        lookup(key)?.check(&value)?;
        self.store(key, value)
    }

    fn get_bool(&self, key: &str) -> Result<bool> {
        match self.get(key)? {
            SettingValue::Bool(b) => Ok(b),
            other => bail!("Setting '{key}' is not a boolean: {other:?}"),
        }
    }

    fn get_int(&self, key: &str) -> Result<i64> {
        match self.get(key)? {
            SettingValue::Int(i) => Ok(i),
            other => bail!("Setting '{key}' is not an integer: {other:?}"),
        }
    }

    fn get_string(&self, key: &str) -> Result<String> {
        match self.get(key)? {
            SettingValue::String(s) => Ok(s),
            other => bail!("Setting '{key}' is not a string: {other:?}"),
        }
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        self.set(key, SettingValue::Bool(value))
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.set(key, SettingValue::Int(value))
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set(key, SettingValue::String(value.to_string()))
    }
}

/// In-process settings store
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    pub values: BTreeMap<String, SettingValue>,
    pub accent: Option<String>,
    /// Every write in order, for inspection
    pub writes: Vec<String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accent(mut self, accent: &str) -> Self {
        self.accent = Some(accent.to_string());
        self
    }
}

impl SettingsStore for MemorySettings {
    fn stored(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: SettingValue) -> Result<()> {
        self.writes.push(key.to_string());
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn accent_color(&self) -> Option<String> {
        self.accent.clone()
    }
}
