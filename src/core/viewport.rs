use super::geometry::{Point, clamp, screen_to_world, world_to_screen_local};

/// Pan/zoom state of the visible viewport over the world plane.
///
/// `pan` is the screen-space offset of the world origin. Zoom is always kept
/// inside `[min_zoom, max_zoom]`, so the coordinate transforms never divide
/// by zero.
#[derive(Debug, Clone)]
pub struct Viewport {
    width: f64,
    height: f64,
    pan: Point,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    zoom_step: f64,
    pan_gesture: Option<PanGesture>,
}

/// Snapshot taken when a background drag starts; moves are additive against
/// these values, not against the live pan.
#[derive(Debug, Clone, Copy)]
struct PanGesture {
    start_pan: Point,
    start_cursor: Point,
}

impl Viewport {
    pub fn new(width: f64, height: f64, min_zoom: f64, max_zoom: f64, zoom_step: f64) -> Self {
        Self {
            width,
            height,
            // World origin starts centered in the viewport.
            pan: Point::new(width / 2.0, height / 2.0),
            zoom: 1.0,
            min_zoom,
            max_zoom,
            zoom_step,
            pan_gesture: None,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn screen_to_world(&self, screen_local: Point) -> Point {
        screen_to_world(screen_local, self.pan, self.zoom)
    }

    pub fn world_to_screen_local(&self, world: Point) -> Point {
        world_to_screen_local(world, self.pan, self.zoom)
    }

    /// World point currently under the viewport center.
    pub fn center_world(&self) -> Point {
        self.screen_to_world(Point::new(self.width / 2.0, self.height / 2.0))
    }

    /// Clamp and apply a new zoom, recomputing pan so the world point at the
    /// viewport center stays at the viewport center.
    pub fn set_zoom(&mut self, next: f64) {
        let next = clamp(next, self.min_zoom, self.max_zoom);
        let center_world = self.center_world();
        self.zoom = next;
        self.pan = Point::new(
            self.width / 2.0 - center_world.x * next,
            self.height / 2.0 - center_world.y * next,
        );
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + self.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - self.zoom_step);
    }

    pub fn zoom_reset(&mut self) {
        self.set_zoom(1.0);
    }

    /// Begin a background pan drag at the given viewport-local cursor point.
    pub fn begin_pan(&mut self, cursor: Point) {
        self.pan_gesture = Some(PanGesture {
            start_pan: self.pan,
            start_cursor: cursor,
        });
    }

    /// Move the active pan gesture; no-op when none is active. Pure screen
    /// translation, independent of the note model.
    pub fn pan_move(&mut self, cursor: Point) {
        if let Some(g) = self.pan_gesture {
            self.pan = Point::new(
                g.start_pan.x + (cursor.x - g.start_cursor.x),
                g.start_pan.y + (cursor.y - g.start_cursor.y),
            );
        }
    }

    pub fn end_pan(&mut self) {
        self.pan_gesture = None;
    }

    pub fn is_panning(&self) -> bool {
        self.pan_gesture.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(1200.0, 800.0, 0.4, 2.2, 0.1)
    }

    #[test]
    fn zoom_keeps_viewport_center_fixed() {
        let mut vp = viewport();
        vp.begin_pan(Point::new(0.0, 0.0));
        vp.pan_move(Point::new(-130.0, 75.0));
        vp.end_pan();

        let before = vp.center_world();
        vp.set_zoom(1.7);
        let after = vp.center_world();

        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn zoom_clamps_to_bounds() {
        let mut vp = viewport();
        vp.set_zoom(10.0);
        assert_eq!(vp.zoom(), 2.2);
        vp.set_zoom(0.0);
        assert_eq!(vp.zoom(), 0.4);
    }

    #[test]
    fn repeated_zoom_in_saturates() {
        let mut vp = viewport();
        for _ in 0..40 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom(), 2.2);
    }

    #[test]
    fn pan_gesture_is_additive_from_start() {
        let mut vp = viewport();
        let initial = vp.pan();
        vp.begin_pan(Point::new(100.0, 100.0));
        vp.pan_move(Point::new(150.0, 90.0));
        // A second move replaces, not accumulates, the delta.
        vp.pan_move(Point::new(160.0, 120.0));
        vp.end_pan();

        assert_eq!(vp.pan(), Point::new(initial.x + 60.0, initial.y + 20.0));
    }

    #[test]
    fn pan_move_without_gesture_is_ignored() {
        let mut vp = viewport();
        let initial = vp.pan();
        vp.pan_move(Point::new(500.0, 500.0));
        assert_eq!(vp.pan(), initial);
    }

    #[test]
    fn world_origin_starts_centered() {
        let vp = viewport();
        let center = vp.center_world();
        assert!((center.x).abs() < 1e-9);
        assert!((center.y).abs() < 1e-9);
    }
}
