//! Geometry value types shared by the adapter, the policy and the overlay

use serde::{Deserialize, Serialize};

/// Position relative to a parent's origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Both extents strictly positive
    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Axis-aligned rectangle in stage coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Signed per-side offsets; negative values pull the border inward
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Margins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Margins {
    pub fn uniform(value: i32) -> Self {
        Self { top: value, right: value, bottom: value, left: value }
    }
}

/// Per-corner radii, never negative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Radius {
    pub tl: u32,
    pub tr: u32,
    pub br: u32,
    pub bl: u32,
}

impl Radius {
    pub const ZERO: Radius = Radius { tl: 0, tr: 0, br: 0, bl: 0 };

    pub fn uniform(value: u32) -> Self {
        Self { tl: value, tr: value, br: value, bl: value }
    }
}

/// Effective border thickness per edge after edge snapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BorderWidths {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl BorderWidths {
    pub fn uniform(value: u32) -> Self {
        Self { top: value, right: value, bottom: value, left: value }
    }
}
