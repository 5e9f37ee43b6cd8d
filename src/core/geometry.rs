//! World-pixel geometry and the screen/world coordinate mapping.
//!
//! World coordinates live on the unbounded note plane and are independent of
//! pan and zoom. Screen-local coordinates are pixels relative to the visible
//! viewport's top-left corner.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn from_origin(origin: Point, width: f64, height: f64) -> Self {
        Self {
            left: origin.x,
            top: origin.y,
            right: origin.x + width,
            bottom: origin.y + height,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Overlap extent along each axis; non-positive when the rectangles are
    /// disjoint on that axis.
    pub fn overlap_extents(&self, other: &Rect) -> (f64, f64) {
        let overlap_x = self.right.min(other.right) - self.left.max(other.left);
        let overlap_y = self.bottom.min(other.bottom) - self.top.max(other.top);
        (overlap_x, overlap_y)
    }

    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let (overlap_x, overlap_y) = self.overlap_extents(other);
        overlap_x.max(0.0) * overlap_y.max(0.0)
    }
}

pub fn clamp(n: f64, min: f64, max: f64) -> f64 {
    n.max(min).min(max)
}

/// Map a viewport-local screen point to world coordinates under the given pan
/// and zoom. Zoom is never zero (the viewport clamps it).
pub fn screen_to_world(screen_local: Point, pan: Point, zoom: f64) -> Point {
    Point {
        x: (screen_local.x - pan.x) / zoom,
        y: (screen_local.y - pan.y) / zoom,
    }
}

/// Inverse of [`screen_to_world`].
pub fn world_to_screen_local(world: Point, pan: Point, zoom: f64) -> Point {
    Point {
        x: world.x * zoom + pan.x,
        y: world.y * zoom + pan.y,
    }
}
