//! Editing operations over the `app-configs` table
//!
//! Every operation mutates a [`RawConfigStore`] in place; callers persist the
//! result through [`crate::config::ConfigEngine::save_app_configs`].

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::config::raw::{
    MarginSides, MarginsValue, RadiusCorners, RadiusValue, RawConfig, RawConfigStore, RawEntry,
    is_preset_key,
};
use crate::constants::rules::DEFAULT_KEY;

/// Spin ranges offered by the editor
pub mod limits {
    pub const WIDTH: (i64, i64) = (0, 50);
    pub const MARGIN: (i64, i64) = (-100, 100);
    pub const RADIUS: (i64, i64) = (0, 200);
}

/// Which kind of key an edit addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    App,
    Preset,
}

impl KeyKind {
    pub fn of(key: &str) -> Self {
        if is_preset_key(key) { KeyKind::Preset } else { KeyKind::App }
    }

    fn validate(self, key: &str) -> Result<()> {
        if key.is_empty() {
            bail!("Key must not be empty");
        }
        match self {
            KeyKind::App if is_preset_key(key) => {
                bail!("App config key '{}' must not start with '@'", key)
            }
            KeyKind::Preset if !is_preset_key(key) => {
                bail!("Preset key '{}' must start with '@'", key)
            }
            _ => Ok(()),
        }
    }
}

/// Single editable field of a config object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Enabled,
    MaximizedBorder,
    Width,
    /// Every side at once
    Margins,
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    /// Every corner at once
    Radius,
    RadiusTl,
    RadiusTr,
    RadiusBr,
    RadiusBl,
    ActiveColor,
    InactiveColor,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::Enabled,
        Field::MaximizedBorder,
        Field::Width,
        Field::Margins,
        Field::MarginTop,
        Field::MarginRight,
        Field::MarginBottom,
        Field::MarginLeft,
        Field::Radius,
        Field::RadiusTl,
        Field::RadiusTr,
        Field::RadiusBr,
        Field::RadiusBl,
        Field::ActiveColor,
        Field::InactiveColor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Enabled => "enabled",
            Field::MaximizedBorder => "maximizedBorder",
            Field::Width => "width",
            Field::Margins => "margins",
            Field::MarginTop => "margin-top",
            Field::MarginRight => "margin-right",
            Field::MarginBottom => "margin-bottom",
            Field::MarginLeft => "margin-left",
            Field::Radius => "radius",
            Field::RadiusTl => "radius-tl",
            Field::RadiusTr => "radius-tr",
            Field::RadiusBr => "radius-br",
            Field::RadiusBl => "radius-bl",
            Field::ActiveColor => "activeColor",
            Field::InactiveColor => "inactiveColor",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(s))
            .with_context(|| {
                let names: Vec<&str> = Field::ALL.iter().map(|f| f.name()).collect();
                format!("Unknown field '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

fn parse_bool(field: Field, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => bail!("{} expects a boolean, got '{}'", field, other),
    }
}

fn parse_ranged(field: Field, value: &str, (lower, upper): (i64, i64)) -> Result<i64> {
    let parsed: i64 = value
        .trim()
        .parse()
        .context(format!("{} expects an integer, got '{}'", field, value))?;
    if !(lower..=upper).contains(&parsed) {
        bail!("{} must be between {} and {}, got {}", field, lower, upper, parsed);
    }
    Ok(parsed)
}

/// Edit the side object of `margins`, replacing a uniform or missing value with an empty object
fn edit_margin_sides(config: &mut RawConfig, edit: impl FnOnce(&mut MarginSides)) {
    let mut sides = match config.margins.take() {
        Some(MarginsValue::Sides(sides)) => sides,
        _ => MarginSides::default(),
    };
    edit(&mut sides);
    config.margins = Some(MarginsValue::Sides(sides));
}

fn edit_radius_corners(config: &mut RawConfig, edit: impl FnOnce(&mut RadiusCorners)) {
    let mut corners = match config.radius.take() {
        Some(RadiusValue::Corners(corners)) => corners,
        _ => RadiusCorners::default(),
    };
    edit(&mut corners);
    config.radius = Some(RadiusValue::Corners(corners));
}

/// Apply one textual field edit to a config object
///
/// An empty color clears the override so the field inherits again.
pub fn apply_field(config: &mut RawConfig, field: Field, value: &str) -> Result<()> {
    match field {
        Field::Enabled => config.enabled = Some(parse_bool(field, value)?),
        Field::MaximizedBorder => config.maximized_border = Some(parse_bool(field, value)?),
        Field::Width => config.width = Some(parse_ranged(field, value, limits::WIDTH)?),
        Field::Margins => {
            let px = parse_ranged(field, value, limits::MARGIN)?;
            config.margins = Some(MarginsValue::Uniform(px));
        }
        Field::MarginTop | Field::MarginRight | Field::MarginBottom | Field::MarginLeft => {
            let px = Some(parse_ranged(field, value, limits::MARGIN)?);
            edit_margin_sides(config, |sides| match field {
                Field::MarginTop => sides.top = px,
                Field::MarginRight => sides.right = px,
                Field::MarginBottom => sides.bottom = px,
                _ => sides.left = px,
            });
        }
        Field::Radius => {
            let px = parse_ranged(field, value, limits::RADIUS)?;
            config.radius = Some(RadiusValue::Uniform(px));
        }
        Field::RadiusTl | Field::RadiusTr | Field::RadiusBr | Field::RadiusBl => {
            let px = Some(parse_ranged(field, value, limits::RADIUS)?);
            edit_radius_corners(config, |corners| match field {
                Field::RadiusTl => corners.tl = px,
                Field::RadiusTr => corners.tr = px,
                Field::RadiusBr => corners.br = px,
                _ => corners.bl = px,
            });
        }
        Field::ActiveColor => config.active_color = non_empty(value),
        Field::InactiveColor => config.inactive_color = non_empty(value),
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn require<'a>(store: &'a RawConfigStore, key: &str) -> Result<&'a RawEntry> {
    store
        .get(key)
        .with_context(|| format!("No config entry named '{}'", key))
}

/// Add a new entry; the key must not exist yet
pub fn add_entry(store: &mut RawConfigStore, key: &str, entry: RawEntry) -> Result<()> {
    let key = key.trim();
    KeyKind::of(key).validate(key)?;
    if store.contains(key) {
        bail!("Config entry '{}' already exists", key);
    }
    if let RawEntry::Preset(preset) = &entry {
        if is_preset_key(key) {
            bail!("Preset '{}' must be an object, not a reference", key);
        }
        check_preset_exists(store, preset)?;
    }
    store.insert(key, entry);
    info!(key = %key, "Added config entry");
    Ok(())
}

/// Delete an entry; the base preset cannot be removed
pub fn remove_entry(store: &mut RawConfigStore, key: &str) -> Result<RawEntry> {
    if key == DEFAULT_KEY {
        bail!("'{}' cannot be removed", DEFAULT_KEY);
    }
    let removed = store
        .remove(key)
        .with_context(|| format!("No config entry named '{}'", key))?;
    info!(key = %key, "Removed config entry");
    Ok(removed)
}

/// Move an entry to a new key
///
/// Renaming a preset rewrites every entry that referenced it. Renaming onto
/// the same key is a no-op.
pub fn rename_entry(store: &mut RawConfigStore, old_key: &str, new_key: &str) -> Result<()> {
    let new_key = new_key.trim();
    if new_key == old_key {
        return Ok(());
    }
    if old_key == DEFAULT_KEY {
        bail!("'{}' cannot be renamed", DEFAULT_KEY);
    }
    let kind = KeyKind::of(old_key);
    kind.validate(new_key)?;
    require(store, old_key)?;
    if store.contains(new_key) {
        bail!("Config entry '{}' already exists", new_key);
    }

    // Replace in place so the entry keeps its position
    let Some(index) = store.entries.get_index_of(old_key) else {
        bail!("No config entry named '{}'", old_key);
    };
    let Some(value) = store.entries.shift_remove(old_key) else {
        bail!("No config entry named '{}'", old_key);
    };
    store.entries.shift_insert(index, new_key.to_string(), value);

    let mut rewritten = 0usize;
    if kind == KeyKind::Preset {
        for entry in store.entries.values_mut() {
            if let RawEntry::Preset(reference) = entry
                && reference == old_key
            {
                *reference = new_key.to_string();
                rewritten += 1;
            }
        }
    }
    info!(from = %old_key, to = %new_key, references = rewritten, "Renamed config entry");
    Ok(())
}

fn check_preset_exists(store: &RawConfigStore, preset: &str) -> Result<()> {
    if !is_preset_key(preset) || preset == DEFAULT_KEY {
        bail!("'{}' is not a selectable preset", preset);
    }
    if store.get(preset).and_then(RawEntry::as_config).is_none() {
        bail!("Preset '{}' does not exist", preset);
    }
    Ok(())
}

/// Point an app entry at a preset
pub fn use_preset(store: &mut RawConfigStore, key: &str, preset: &str) -> Result<()> {
    if KeyKind::of(key) == KeyKind::Preset {
        bail!("Presets cannot reference other presets");
    }
    require(store, key)?;
    check_preset_exists(store, preset)?;
    store.insert(key, RawEntry::Preset(preset.to_string()));
    info!(key = %key, preset = %preset, "Entry now uses preset");
    Ok(())
}

/// Turn an entry into an editable object
///
/// A preset reference becomes a copy of the preset's object (empty when the
/// preset is missing); an existing object is kept as is.
pub fn customize(store: &mut RawConfigStore, key: &str) -> Result<()> {
    let config = match require(store, key)? {
        RawEntry::Config(_) => return Ok(()),
        RawEntry::Preset(preset) => store.preset_config(preset),
    };
    store.insert(key, RawEntry::Config(config));
    debug!(key = %key, "Entry customized");
    Ok(())
}

/// Replace an entry with an empty override
pub fn reset(store: &mut RawConfigStore, key: &str) -> Result<()> {
    require(store, key)?;
    store.insert(key, RawEntry::Config(RawConfig::default()));
    info!(key = %key, "Entry reset");
    Ok(())
}

/// Edit one field of an entry
///
/// Entries that reference a preset must be customized first.
pub fn set_field(store: &mut RawConfigStore, key: &str, field: Field, value: &str) -> Result<()> {
    let mut config = match require(store, key)? {
        RawEntry::Config(config) => config.clone(),
        RawEntry::Preset(preset) => {
            bail!("'{}' uses preset '{}'; customize it before editing fields", key, preset)
        }
    };
    apply_field(&mut config, field, value).context(format!("Failed to set {} on '{}'", field, key))?;
    store.insert(key, RawEntry::Config(config));
    debug!(key = %key, field = %field, value = %value, "Field updated");
    Ok(())
}

fn parse_object(text: &str) -> Result<serde_json::Value> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Nothing to apply: input is empty");
    }
    let value: serde_json::Value = serde_json::from_str(text).context("Invalid JSON")?;
    if !value.is_object() {
        bail!("Expected a JSON object");
    }
    Ok(value)
}

/// Parse a single config object typed by hand
pub fn entry_from_json(text: &str) -> Result<RawConfig> {
    serde_json::from_value(parse_object(text)?).context("Invalid config object")
}

/// Parse a whole replacement table from the raw JSON editor
pub fn table_from_json(text: &str) -> Result<RawConfigStore> {
    let table: RawConfigStore =
        serde_json::from_value(parse_object(text)?).context("Invalid app-configs table")?;
    info!(entries = table.entries.len(), "Parsed replacement table");
    Ok(table)
}
