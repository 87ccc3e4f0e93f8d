//! Style policy: what border, if any, a window should get
//!
//! Pure function of a [`WindowSnapshot`] and a [`ResolvedConfig`]; no host
//! access happens here.

use crate::config::ResolvedConfig;
use crate::constants::policy::MIN_OVERLAY_EXTENT;
use crate::geometry::WindowSnapshot;
use crate::snapping::{SnappedEdges, edge_threshold, find_snapped_edges};
use crate::types::{BorderWidths, Position, Radius, Size};

/// Decided overlay state for one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorderState {
    Hidden,
    Visible {
        border_widths: BorderWidths,
        radius: Radius,
        /// Relative to the content's top-left corner
        position: Position,
        size: Size,
        color: String,
    },
}

fn is_suppressed(snapshot: &WindowSnapshot, config: &ResolvedConfig) -> bool {
    snapshot.is_fullscreen
        || snapshot.maximize.full
        || (snapshot.maximize.any && !config.maximized_border)
        || config.width == 0
        || !config.enabled
        || !snapshot.content_size.is_positive()
}

fn effective_radius(
    config: &ResolvedConfig,
    snapped: SnappedEdges,
    snapshot: &WindowSnapshot,
    rounding_enabled: bool,
) -> Radius {
    if !rounding_enabled || snapshot.maximize.any {
        return Radius::ZERO;
    }
    let corner = |radius: u32, a: bool, b: bool| if a && b { 0 } else { radius };
    Radius {
        tl: corner(config.radius.tl, snapped.top, snapped.left),
        tr: corner(config.radius.tr, snapped.top, snapped.right),
        br: corner(config.radius.br, snapped.bottom, snapped.right),
        bl: corner(config.radius.bl, snapped.bottom, snapped.left),
    }
}

/// Narrow a widened pixel value back to `i32`, saturating at the bounds
fn clamp_px(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Decide the border for `snapshot` under `config`
///
/// Edges within `max(2, width)` pixels of the work area get no border, and a
/// corner loses its rounding only when both of its edges are snapped. Without
/// a work area nothing counts as snapped.
pub fn decide(snapshot: &WindowSnapshot, config: &ResolvedConfig, rounding_enabled: bool) -> BorderState {
    if is_suppressed(snapshot, config) {
        return BorderState::Hidden;
    }

    let snapped = snapshot
        .work_area
        .map(|area| find_snapped_edges(snapshot.frame, area, edge_threshold(config.width)))
        .unwrap_or(SnappedEdges::NONE);

    let width = |edge_snapped: bool| if edge_snapped { 0 } else { config.width };
    let border_widths = BorderWidths {
        top: width(snapped.top),
        right: width(snapped.right),
        bottom: width(snapped.bottom),
        left: width(snapped.left),
    };

    // Pixel math in i64, saturated back to i32
    let margins = config.margins;
    let (top, right, bottom, left) = (
        i64::from(margins.top),
        i64::from(margins.right),
        i64::from(margins.bottom),
        i64::from(margins.left),
    );
    let bw = |w: u32| i64::from(w);
    let position = Position::new(
        clamp_px(-left - bw(border_widths.left)),
        clamp_px(-top - bw(border_widths.top)),
    );
    let content = snapshot.content_size;
    let min = i64::from(MIN_OVERLAY_EXTENT);
    let size = Size::new(
        clamp_px(
            (i64::from(content.width) + left + right + bw(border_widths.left) + bw(border_widths.right))
                .max(min),
        ),
        clamp_px(
            (i64::from(content.height) + top + bottom + bw(border_widths.top) + bw(border_widths.bottom))
                .max(min),
        ),
    );

    let color = if snapshot.is_focused {
        config.active_color.clone()
    } else {
        config.inactive_color.clone()
    };

    BorderState::Visible {
        border_widths,
        radius: effective_radius(config, snapped, snapshot, rounding_enabled),
        position,
        size,
        color,
    }
}
