use crate::constants::policy::EDGE_EPSILON;
use crate::types::Rect;

/// Which frame edges sit flush against the work area
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnappedEdges {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl SnappedEdges {
    pub const NONE: SnappedEdges = SnappedEdges {
        top: false,
        right: false,
        bottom: false,
        left: false,
    };
}

/// Tolerance used for edge detection: never below the epsilon, grows with the border
pub fn edge_threshold(border_width: u32) -> i32 {
    EDGE_EPSILON.max(i32::try_from(border_width).unwrap_or(i32::MAX))
}

/// Mark each frame edge that lies within `threshold` pixels of the matching work area edge
pub fn find_snapped_edges(frame: Rect, work_area: Rect, threshold: i32) -> SnappedEdges {
    SnappedEdges {
        top: is_snapped(frame.top(), work_area.top(), threshold),
        right: is_snapped(frame.right(), work_area.right(), threshold),
        bottom: is_snapped(frame.bottom(), work_area.bottom(), threshold),
        left: is_snapped(frame.left(), work_area.left(), threshold),
    }
}

fn is_snapped(edge: i32, target: i32, threshold: i32) -> bool {
    let distance = (i64::from(edge) - i64::from(target)).abs();
    distance <= i64::from(threshold)
}
