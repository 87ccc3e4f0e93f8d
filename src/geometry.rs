//! Geometry/state adapter
//!
//! Reads everything the style policy needs from the host in one place, and
//! resolves host-version differences (maximize bitmask vs. per-axis booleans,
//! failing frame/work-area queries) so nothing downstream has to.

use tracing::debug;

use crate::host::{ActorId, ActorOps, DisplayOps, MaximizeFlags, WindowId, WindowOps};
use crate::types::{Rect, Size};

/// Maximize state along each axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaximizeState {
    pub horizontal: bool,
    pub vertical: bool,
    /// Maximized along at least one axis
    pub any: bool,
    /// Maximized along both axes
    pub full: bool,
}

impl MaximizeState {
    /// Build from a host bitmask; a zero mask is treated as absent
    pub fn from_flags(flags: MaximizeFlags) -> Option<Self> {
        if flags.is_empty() {
            return None;
        }
        let horizontal = flags.contains(MaximizeFlags::HORIZONTAL);
        let vertical = flags.contains(MaximizeFlags::VERTICAL);
        Some(Self {
            horizontal,
            vertical,
            any: horizontal || vertical,
            full: flags & MaximizeFlags::BOTH == MaximizeFlags::BOTH,
        })
    }

    pub fn from_axes(horizontal: bool, vertical: bool) -> Self {
        Self {
            horizontal,
            vertical,
            any: horizontal || vertical,
            full: horizontal && vertical,
        }
    }
}

/// Normalized view of a window at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub content_size: Size,
    pub frame: Rect,
    /// `None` only when neither the window's nor the primary work area could be read
    pub work_area: Option<Rect>,
    pub maximize: MaximizeState,
    pub is_fullscreen: bool,
    pub is_focused: bool,
}

pub fn maximize_state<H>(host: &H, window: WindowId) -> MaximizeState
where
    H: WindowOps + ?Sized,
{
    host.maximize_flags(window)
        .and_then(MaximizeState::from_flags)
        .unwrap_or_else(|| {
            MaximizeState::from_axes(
                host.maximized_horizontally(window),
                host.maximized_vertically(window),
            )
        })
}

/// Allocated content size of `actor`, zero when unallocated
pub fn content_size<H>(host: &H, actor: ActorId) -> Size
where
    H: ActorOps + ?Sized,
{
    host.allocation(actor).map(|a| a.size()).unwrap_or_default()
}

/// Read a full snapshot of `window` and its `actor`
///
/// Never fails: frame and work-area queries fall back to the actor position
/// and the primary monitor, respectively.
pub fn snapshot<H>(host: &H, window: WindowId, actor: ActorId) -> WindowSnapshot
where
    H: WindowOps + ActorOps + DisplayOps + ?Sized,
{
    let content_size = content_size(host, actor);

    let frame = host.frame_rect(window).unwrap_or_else(|err| {
        debug!(window = %window, error = %err, "frame rect unavailable, using actor geometry");
        let pos = host.actor_position(actor);
        Rect::new(pos.x, pos.y, content_size.width, content_size.height)
    });

    let work_area = host
        .work_area(window)
        .or_else(|err| {
            debug!(window = %window, error = %err, "work area unavailable, using primary monitor");
            host.primary_work_area()
        })
        .inspect_err(|err| debug!(window = %window, error = %err, "primary work area unavailable"))
        .ok();

    WindowSnapshot {
        content_size,
        frame,
        work_area,
        maximize: maximize_state(host, window),
        is_fullscreen: host.is_fullscreen(window),
        is_focused: host.focus_window() == Some(window),
    }
}
