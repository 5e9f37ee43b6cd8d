//! Non-overlapping placement search.
//!
//! Both variants are deterministic given the same rectangles and anchor. The
//! unbounded variant serves the world-pixel canvas; the bounded variant keeps
//! the earlier viewport-percentage deployment working. A single call uses a
//! single policy.

use super::geometry::{Point, Rect, clamp};
use super::note::{NOTE_HEIGHT, NOTE_WIDTH};
use super::overlap::OverlapPolicy;

/// Radius increment between rings, in world pixels.
const RING_STEP: f64 = 28.0;
/// Samples per ring.
const RING_SAMPLES: u32 = 16;
/// Give up past this radius; the board is effectively empty that far out.
const MAX_RADIUS: f64 = 2500.0;

const BOUNDED_STEP: f64 = 24.0;
const BOUNDED_RING_SAMPLES: u32 = 8;

fn candidate_rect(origin: Point) -> Rect {
    Rect::from_origin(origin, NOTE_WIDTH, NOTE_HEIGHT)
}

/// Find the nearest spot to `anchor` where a new note rectangle satisfies the
/// overlap policy against `existing`, on an unbounded plane.
///
/// Returns the anchor unchanged when it already fits (the common sparse-board
/// case) and, as the documented fallback, when no ring up to the search bound
/// fits either.
pub fn find_position(existing: &[Rect], anchor: Point, policy: OverlapPolicy) -> Point {
    let fits = |origin: Point| policy.fits(&candidate_rect(origin), existing);

    if fits(anchor) {
        return anchor;
    }

    let mut r = RING_STEP;
    while r <= MAX_RADIUS {
        for k in 0..RING_SAMPLES {
            let angle = std::f64::consts::TAU * k as f64 / RING_SAMPLES as f64;
            let candidate = Point::new(anchor.x + r * angle.cos(), anchor.y + r * angle.sin());
            if fits(candidate) {
                return candidate;
            }
        }
        r += RING_STEP;
    }

    anchor
}

/// Bounded-canvas variant: anchor at the canvas center, candidates clamped to
/// the canvas, and a top-left to bottom-right grid scan before giving up on
/// the center.
pub fn find_position_in_bounds(
    existing: &[Rect],
    canvas_width: f64,
    canvas_height: f64,
    policy: OverlapPolicy,
) -> Point {
    let max_x = canvas_width - NOTE_WIDTH;
    let max_y = canvas_height - NOTE_HEIGHT;
    if max_x <= 0.0 || max_y <= 0.0 {
        return Point::default();
    }

    let fits = |origin: Point| policy.fits(&candidate_rect(origin), existing);

    let center = Point::new(
        clamp(canvas_width / 2.0 - NOTE_WIDTH / 2.0, 0.0, max_x),
        clamp(canvas_height / 2.0 - NOTE_HEIGHT / 2.0, 0.0, max_y),
    );
    if fits(center) {
        return center;
    }

    let max_r = canvas_width.hypot(canvas_height);
    let mut r = BOUNDED_STEP;
    while r <= max_r {
        for k in 0..BOUNDED_RING_SAMPLES {
            let angle = std::f64::consts::TAU * k as f64 / BOUNDED_RING_SAMPLES as f64;
            let candidate = Point::new(
                clamp(center.x + r * angle.cos(), 0.0, max_x),
                clamp(center.y + r * angle.sin(), 0.0, max_y),
            );
            if fits(candidate) {
                return candidate;
            }
        }
        r += BOUNDED_STEP;
    }

    // Grid scan, top-left to bottom-right.
    let mut y = 0.0;
    while y <= max_y {
        let mut x = 0.0;
        while x <= max_x {
            let candidate = Point::new(x, y);
            if fits(candidate) {
                return candidate;
            }
            x += BOUNDED_STEP;
        }
        y += BOUNDED_STEP;
    }

    center
}
