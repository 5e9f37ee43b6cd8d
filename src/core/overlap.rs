use serde::{Deserialize, Serialize};

use super::geometry::Rect;

/// Overlap a pair of notes may share along each axis before the
/// edge-tolerance policy objects. Thin edge-stacking stays allowed.
pub const EDGE_TOLERANCE_PX: f64 = 2.0;

/// Fraction of one note's area the intersection may cover before the
/// area-fraction policy objects.
pub const MAX_AREA_FRACTION: f64 = 0.35;

/// Decides whether two fixed-size note rectangles overlap "too much".
///
/// A placement operation uses exactly one policy; the choice is a deployment
/// setting, not a per-call one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Overlapping more than `max_overlap_px` on BOTH axes is too much.
    EdgeTolerance { max_overlap_px: f64 },
    /// An intersection covering more than `max_fraction` of a note's area is
    /// too much.
    AreaFraction { max_fraction: f64 },
}

impl Default for OverlapPolicy {
    fn default() -> Self {
        Self::AreaFraction {
            max_fraction: MAX_AREA_FRACTION,
        }
    }
}

impl OverlapPolicy {
    pub fn edge_tolerance() -> Self {
        Self::EdgeTolerance {
            max_overlap_px: EDGE_TOLERANCE_PX,
        }
    }

    pub fn area_fraction() -> Self {
        Self::default()
    }

    pub fn overlaps_too_much(&self, a: &Rect, b: &Rect) -> bool {
        match *self {
            Self::EdgeTolerance { max_overlap_px } => {
                let (overlap_x, overlap_y) = a.overlap_extents(b);
                overlap_x > max_overlap_px && overlap_y > max_overlap_px
            }
            Self::AreaFraction { max_fraction } => {
                let area = a.area().min(b.area());
                if area <= 0.0 {
                    return false;
                }
                a.intersection_area(b) > max_fraction * area
            }
        }
    }

    /// True when `rect` stays acceptable against every existing rectangle.
    pub fn fits(&self, rect: &Rect, existing: &[Rect]) -> bool {
        !existing.iter().any(|r| self.overlaps_too_much(rect, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Point;
    use crate::core::note::{NOTE_HEIGHT, NOTE_WIDTH};

    fn note_rect(x: f64, y: f64) -> Rect {
        Rect::from_origin(Point::new(x, y), NOTE_WIDTH, NOTE_HEIGHT)
    }

    #[test]
    fn edge_tolerance_allows_thin_stacking() {
        let policy = OverlapPolicy::edge_tolerance();
        let a = note_rect(0.0, 0.0);
        // 2 px of horizontal overlap, full vertical overlap: still fine.
        let b = note_rect(NOTE_WIDTH - 2.0, 0.0);
        assert!(!policy.overlaps_too_much(&a, &b));
        // 3 px on both axes crosses the line.
        let c = note_rect(NOTE_WIDTH - 3.0, NOTE_HEIGHT - 3.0);
        assert!(policy.overlaps_too_much(&a, &c));
    }

    #[test]
    fn edge_tolerance_requires_both_axes() {
        let policy = OverlapPolicy::edge_tolerance();
        let a = note_rect(0.0, 0.0);
        // Heavy horizontal overlap but vertically separated.
        let b = note_rect(10.0, NOTE_HEIGHT + 5.0);
        assert!(!policy.overlaps_too_much(&a, &b));
    }

    #[test]
    fn area_fraction_thresholds_at_35_percent() {
        let policy = OverlapPolicy::area_fraction();
        let a = note_rect(0.0, 0.0);
        // Full-height overlap covering 30% of the width: under the line.
        let b = note_rect(NOTE_WIDTH * 0.7, 0.0);
        assert!(!policy.overlaps_too_much(&a, &b));
        // 40% of the width: over it.
        let c = note_rect(NOTE_WIDTH * 0.6, 0.0);
        assert!(policy.overlaps_too_much(&a, &c));
    }

    #[test]
    fn fits_checks_every_rect() {
        let policy = OverlapPolicy::area_fraction();
        let existing = vec![note_rect(0.0, 0.0), note_rect(1000.0, 1000.0)];
        assert!(policy.fits(&note_rect(400.0, 400.0), &existing));
        assert!(!policy.fits(&note_rect(1010.0, 1010.0), &existing));
    }

    #[test]
    fn identical_rects_violate_both_policies() {
        let r = note_rect(100.0, 100.0);
        assert!(OverlapPolicy::edge_tolerance().overlaps_too_much(&r, &r));
        assert!(OverlapPolicy::area_fraction().overlaps_too_much(&r, &r));
    }
}
