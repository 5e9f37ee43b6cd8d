//! Drag lifecycle for the locally-owned note being moved.
//!
//! One drag at a time per client. Visual position updates are coalesced to
//! one per animation frame; outbound position sends are throttled to a
//! minimum interval and always carry the latest position, never a backlog.
//! The controller is pure bookkeeping: the session applies the returned
//! effects to board state and the network.

use std::time::{Duration, Instant};

use uuid::Uuid;

use super::geometry::Point;

/// Minimum interval between outbound position sends while dragging.
pub const SEND_INTERVAL: Duration = Duration::from_millis(120);

/// Pointer travel (screen px) before a press counts as a real drag rather
/// than a click.
pub const DRAG_MOVE_THRESHOLD_PX: f64 = 4.0;

/// A click this soon after a drag of the same note is the drag's mouse-up,
/// not a request to open the note.
pub const CLICK_SUPPRESS_WINDOW: Duration = Duration::from_millis(250);

/// Position update that should go out on the wire now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSend {
    pub note_id: Uuid,
    pub position: Point,
}

/// Everything the session needs to conclude a drag: the final flush plus the
/// raw release position to snap and commit.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseOutcome {
    pub note_id: Uuid,
    /// Coalesced visual update not yet flushed, if any.
    pub pending: Option<Point>,
    /// Latest computed world position; `None` when the pointer never moved.
    pub release_position: Option<Point>,
    /// Whether the press travelled far enough to count as a drag.
    pub moved: bool,
}

#[derive(Debug)]
struct ActiveDrag {
    note_id: Uuid,
    /// Pointer's world-space offset from the note origin at press time.
    grab_offset: Point,
    start_screen: Point,
    moved: bool,
    latest: Option<Point>,
    pending: Option<Point>,
    last_sent_at: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct DragController {
    active: Option<ActiveDrag>,
    last_finished: Option<(Uuid, Instant)>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> Option<Uuid> {
        self.active.as_ref().map(|d| d.note_id)
    }

    /// Enter `Dragging`. The caller concludes any active drag first; this is
    /// a global, not per-note, exclusivity rule.
    pub fn begin(
        &mut self,
        note_id: Uuid,
        note_origin: Point,
        pointer_world: Point,
        pointer_screen: Point,
    ) {
        debug_assert!(self.active.is_none(), "previous drag not concluded");
        self.active = Some(ActiveDrag {
            note_id,
            grab_offset: Point::new(
                pointer_world.x - note_origin.x,
                pointer_world.y - note_origin.y,
            ),
            start_screen: pointer_screen,
            moved: false,
            latest: None,
            pending: None,
            last_sent_at: None,
        });
    }

    /// Record pointer movement. Returns a send when the throttle interval has
    /// elapsed; the latest position always supersedes anything unsent.
    pub fn motion(
        &mut self,
        pointer_world: Point,
        pointer_screen: Point,
        now: Instant,
    ) -> Option<DragSend> {
        let drag = self.active.as_mut()?;

        if !drag.moved {
            let dx = pointer_screen.x - drag.start_screen.x;
            let dy = pointer_screen.y - drag.start_screen.y;
            if dx.hypot(dy) >= DRAG_MOVE_THRESHOLD_PX {
                drag.moved = true;
            }
        }

        let position = Point::new(
            pointer_world.x - drag.grab_offset.x,
            pointer_world.y - drag.grab_offset.y,
        );
        drag.latest = Some(position);
        drag.pending = Some(position);

        let due = drag
            .last_sent_at
            .is_none_or(|t| now.duration_since(t) >= SEND_INTERVAL);
        if due {
            drag.last_sent_at = Some(now);
            return Some(DragSend {
                note_id: drag.note_id,
                position,
            });
        }
        None
    }

    /// Take the coalesced visual update for this animation frame, if any.
    pub fn take_frame(&mut self) -> Option<(Uuid, Point)> {
        let drag = self.active.as_mut()?;
        drag.pending.take().map(|p| (drag.note_id, p))
    }

    /// Leave `Dragging`. The outcome carries the final flush and release
    /// position for the caller to snap and commit.
    pub fn release(&mut self, now: Instant) -> Option<ReleaseOutcome> {
        let drag = self.active.take()?;
        if drag.moved {
            self.last_finished = Some((drag.note_id, now));
        }
        Some(ReleaseOutcome {
            note_id: drag.note_id,
            pending: drag.pending,
            release_position: drag.latest,
            moved: drag.moved,
        })
    }

    /// Whether a click on `note_id` right now is the tail end of a drag.
    pub fn recently_finished(&self, note_id: Uuid, now: Instant) -> bool {
        self.last_finished
            .is_some_and(|(id, at)| id == note_id && now.duration_since(at) < CLICK_SUPPRESS_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_drag(ctl: &mut DragController, id: Uuid) {
        // Grab the note at (100, 100) with the pointer 10 px inside it.
        ctl.begin(
            id,
            Point::new(100.0, 100.0),
            Point::new(110.0, 110.0),
            Point::new(110.0, 110.0),
        );
    }

    #[test]
    fn motion_applies_grab_offset() {
        let mut ctl = DragController::new();
        let id = Uuid::new_v4();
        start_drag(&mut ctl, id);

        let now = Instant::now();
        let send = ctl
            .motion(Point::new(210.0, 310.0), Point::new(210.0, 310.0), now)
            .expect("first move sends");
        assert_eq!(send.position, Point::new(200.0, 300.0));
    }

    #[test]
    fn sends_are_throttled_but_frames_coalesce() {
        let mut ctl = DragController::new();
        let id = Uuid::new_v4();
        start_drag(&mut ctl, id);

        let t0 = Instant::now();
        assert!(
            ctl.motion(Point::new(120.0, 110.0), Point::new(120.0, 110.0), t0)
                .is_some()
        );
        // 40 ms later: inside the throttle window, no send.
        let t1 = t0 + Duration::from_millis(40);
        assert!(
            ctl.motion(Point::new(130.0, 110.0), Point::new(130.0, 110.0), t1)
                .is_none()
        );
        // The frame flush still carries the newest position.
        let (_, pos) = ctl.take_frame().unwrap();
        assert_eq!(pos, Point::new(120.0, 100.0));
        // And only once per frame.
        assert!(ctl.take_frame().is_none());
    }

    #[test]
    fn two_second_drag_is_bounded_by_throttle() {
        // Pointer moves every 16 ms for 2 s toward (910, 910); the note
        // lands on (900, 900) after the grab offset.
        let mut ctl = DragController::new();
        let id = Uuid::new_v4();
        start_drag(&mut ctl, id);

        let t0 = Instant::now();
        let mut sends = 0;
        let steps = 125; // 2 s / 16 ms
        for i in 1..=steps {
            let frac = i as f64 / steps as f64;
            let px = 110.0 + (910.0 - 110.0) * frac;
            let now = t0 + Duration::from_millis(16 * i as u64);
            if ctl.motion(Point::new(px, px), Point::new(px, px), now).is_some() {
                sends += 1;
            }
        }

        let outcome = ctl.release(t0 + Duration::from_secs(2)).unwrap();
        assert!(outcome.moved);
        let final_pos = outcome.release_position.unwrap();
        assert!((final_pos.x - 900.0).abs() < 1e-9);
        assert!((final_pos.y - 900.0).abs() < 1e-9);

        // Total sends, release included, stay within elapsed/interval + 1.
        assert!(sends + 1 <= 2000 / 120 + 1);
        assert!(sends >= 2);
    }

    #[test]
    fn short_press_is_a_click_not_a_drag() {
        let mut ctl = DragController::new();
        let id = Uuid::new_v4();
        start_drag(&mut ctl, id);

        let now = Instant::now();
        // 2 px of travel: under the threshold.
        ctl.motion(Point::new(112.0, 110.0), Point::new(112.0, 110.0), now);
        let outcome = ctl.release(now).unwrap();

        assert!(!outcome.moved);
        assert!(!ctl.recently_finished(id, now));
    }

    #[test]
    fn click_right_after_drag_is_suppressed() {
        let mut ctl = DragController::new();
        let id = Uuid::new_v4();
        start_drag(&mut ctl, id);

        let t0 = Instant::now();
        ctl.motion(Point::new(200.0, 200.0), Point::new(200.0, 200.0), t0);
        ctl.release(t0).unwrap();

        assert!(ctl.recently_finished(id, t0 + Duration::from_millis(100)));
        assert!(!ctl.recently_finished(id, t0 + Duration::from_millis(300)));
        // Other notes are unaffected.
        assert!(!ctl.recently_finished(Uuid::new_v4(), t0));
    }

    #[test]
    fn release_without_motion_has_no_position() {
        let mut ctl = DragController::new();
        let id = Uuid::new_v4();
        start_drag(&mut ctl, id);

        let outcome = ctl.release(Instant::now()).unwrap();
        assert!(outcome.release_position.is_none());
        assert!(outcome.pending.is_none());
        assert!(ctl.dragging().is_none());
    }
}
