//! Normalization of raw configs into fully-specified [`ResolvedConfig`] values

use serde::Serialize;

use crate::config::raw::{MarginSides, MarginsValue, RadiusCorners, RadiusValue, RawConfig};
use crate::constants::color;
use crate::types::{Margins, Radius};

/// Process-wide toggles, rebuilt in full on every reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalConfig {
    pub radius_enabled: bool,
    pub modal_enabled: bool,
    pub verbose_logging: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            radius_enabled: true,
            modal_enabled: true,
            verbose_logging: false,
        }
    }
}

/// Fully-normalized style configuration for one window
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub enabled: bool,
    pub maximized_border: bool,
    pub width: u32,
    pub margins: Margins,
    pub radius: Radius,
    pub active_color: String,
    pub inactive_color: String,
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn clamp_px(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

/// A bare number applies to every side; missing sides default to 0; negatives are kept
pub fn normalize_margins(margins: Option<&MarginsValue>) -> Margins {
    match margins {
        Some(MarginsValue::Uniform(value)) => Margins::uniform(clamp_i32(*value)),
        Some(MarginsValue::Sides(sides)) => Margins {
            top: clamp_i32(sides.top.unwrap_or(0)),
            right: clamp_i32(sides.right.unwrap_or(0)),
            bottom: clamp_i32(sides.bottom.unwrap_or(0)),
            left: clamp_i32(sides.left.unwrap_or(0)),
        },
        None => Margins::default(),
    }
}

/// A bare number applies to every corner; missing corners default to 0; floored at 0
pub fn normalize_radius(radius: Option<&RadiusValue>, radius_enabled: bool) -> Radius {
    if !radius_enabled {
        return Radius::ZERO;
    }
    match radius {
        Some(RadiusValue::Uniform(value)) => Radius::uniform(clamp_px(*value)),
        Some(RadiusValue::Corners(corners)) => Radius {
            tl: clamp_px(corners.tl.unwrap_or(0)),
            tr: clamp_px(corners.tr.unwrap_or(0)),
            br: clamp_px(corners.br.unwrap_or(0)),
            bl: clamp_px(corners.bl.unwrap_or(0)),
        },
        None => Radius::ZERO,
    }
}

impl From<Margins> for MarginsValue {
    fn from(m: Margins) -> Self {
        MarginsValue::Sides(MarginSides {
            top: Some(m.top.into()),
            right: Some(m.right.into()),
            bottom: Some(m.bottom.into()),
            left: Some(m.left.into()),
        })
    }
}

impl From<Radius> for RadiusValue {
    fn from(r: Radius) -> Self {
        RadiusValue::Corners(RadiusCorners {
            tl: Some(r.tl.into()),
            tr: Some(r.tr.into()),
            br: Some(r.br.into()),
            bl: Some(r.bl.into()),
        })
    }
}

impl ResolvedConfig {
    /// Normalize a merged raw config; unset scalars take the schema fallbacks
    pub fn normalize(raw: &RawConfig, global: &GlobalConfig) -> Self {
        Self {
            enabled: raw.enabled.unwrap_or(false),
            maximized_border: raw.maximized_border.unwrap_or(false),
            width: clamp_px(raw.width.unwrap_or(0)),
            margins: normalize_margins(raw.margins.as_ref()),
            radius: normalize_radius(raw.radius.as_ref(), global.radius_enabled),
            active_color: raw
                .active_color
                .clone()
                .unwrap_or_else(|| color::DEFAULT_ACCENT.to_string()),
            inactive_color: raw
                .inactive_color
                .clone()
                .unwrap_or_else(|| color::DEFAULT_INACTIVE.to_string()),
        }
    }

    /// The raw form of this config, used as the merge base for rules
    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            enabled: Some(self.enabled),
            maximized_border: Some(self.maximized_border),
            width: Some(self.width.into()),
            margins: Some(self.margins.into()),
            radius: Some(self.radius.into()),
            active_color: Some(self.active_color.clone()),
            inactive_color: Some(self.inactive_color.clone()),
            extra: serde_json::Map::new(),
        }
    }
}
