//! Applying border decisions to overlay nodes

use std::fmt::Write as _;

use anyhow::{Context, Result};

use crate::host::{OverlayId, OverlayOps};
use crate::policy::BorderState;
use crate::types::{BorderWidths, Radius};

/// Structured style description handed to the host's styling layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverlayStyle {
    pub border_widths: BorderWidths,
    pub radius: Radius,
    pub color: String,
}

impl OverlayStyle {
    /// Declarative style string: per-edge widths, per-corner radii, solid color, transparent fill
    pub fn to_css(&self) -> String {
        let BorderWidths { top, right, bottom, left } = self.border_widths;
        let Radius { tl, tr, br, bl } = self.radius;
        let mut css = String::new();
        let _ = write!(
            css,
            "border-top-width: {top}px;\
             border-right-width: {right}px;\
             border-bottom-width: {bottom}px;\
             border-left-width: {left}px;\
             border-radius: {tl}px {tr}px {br}px {bl}px;\
             border-style: solid;\
             border-color: {};\
             background: transparent;",
            self.color
        );
        css
    }

    pub fn fingerprint(&self) -> StyleFingerprint {
        StyleFingerprint(self.clone())
    }
}

/// Summary of the last style written to an overlay
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StyleFingerprint(OverlayStyle);

/// Push `state` onto `overlay`
///
/// Geometry is always written; the style only when it differs from `cache`.
/// Hiding clears the cache so the next visible state rewrites the style.
pub fn apply_border_state<H>(
    host: &mut H,
    overlay: OverlayId,
    state: &BorderState,
    cache: &mut Option<StyleFingerprint>,
) -> Result<()>
where
    H: OverlayOps + ?Sized,
{
    let BorderState::Visible { border_widths, radius, position, size, color } = state else {
        *cache = None;
        return host
            .set_overlay_visible(overlay, false)
            .context(format!("Failed to hide overlay {}", overlay));
    };

    host.set_overlay_position(overlay, *position)
        .context(format!("Failed to position overlay {}", overlay))?;
    host.set_overlay_size(overlay, size.width, size.height)
        .context(format!("Failed to resize overlay {}", overlay))?;

    let style = OverlayStyle {
        border_widths: *border_widths,
        radius: *radius,
        color: color.clone(),
    };
    let fingerprint = style.fingerprint();
    if cache.as_ref() != Some(&fingerprint) {
        host.set_overlay_style(overlay, &style)
            .context(format!("Failed to style overlay {}", overlay))?;
    }

    host.set_overlay_visible(overlay, true)
        .context(format!("Failed to show overlay {}", overlay))?;
    *cache = Some(fingerprint);
    Ok(())
}
