//! Merges the realtime change feed into local board state.
//!
//! The transport has no ordering guarantee, so correctness rests on the
//! per-note last-applied timestamp comparison plus a short cooldown that
//! absorbs the late echo of this client's own writes. Local intent always
//! wins while a drag is active.

use std::time::{Duration, Instant};

use crate::core::board::BoardState;

use super::ChangeEvent;

/// How long after a local move remote updates for that note stay ignored.
pub const UPDATE_COOLDOWN: Duration = Duration::from_millis(450);

/// What happened to an event. Dropped events are normal operation, not
/// errors; the variants exist for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    /// Insert for an id already present (our own optimistic insert).
    DuplicateInsert,
    /// Update for the note currently being dragged here.
    DraggingLocally,
    /// Update inside the post-move cooldown window.
    WithinCooldown,
    /// Update not newer than what was already applied.
    Stale,
    /// Update or delete for a note this client has never seen.
    UnknownNote,
}

impl ReconcileOutcome {
    pub fn applied(self) -> bool {
        self == Self::Applied
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    cooldown: Duration,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            cooldown: UPDATE_COOLDOWN,
        }
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn apply(
        &self,
        board: &mut BoardState,
        event: ChangeEvent,
        now: Instant,
    ) -> ReconcileOutcome {
        match event {
            ChangeEvent::Inserted(note) => {
                let id = note.id;
                let stamp = note.updated_at.or(note.created_at);
                if !board.insert_unique(note) {
                    return ReconcileOutcome::DuplicateInsert;
                }
                if let Some(at) = stamp {
                    board.record_applied(id, at);
                }
                ReconcileOutcome::Applied
            }
            ChangeEvent::Updated(note) => {
                let id = note.id;

                if board.dragging() == Some(id) {
                    return ReconcileOutcome::DraggingLocally;
                }

                if let Some(moved_at) = board.last_local_move(id) {
                    if now.duration_since(moved_at) < self.cooldown {
                        return ReconcileOutcome::WithinCooldown;
                    }
                }

                let stamp = note.updated_at.or(note.created_at);
                match (stamp, board.last_applied(id)) {
                    (Some(at), Some(prev)) if at <= prev => return ReconcileOutcome::Stale,
                    // A stamped version was applied before; an unstamped
                    // event cannot prove it is newer.
                    (None, Some(_)) => return ReconcileOutcome::Stale,
                    _ => {}
                }

                if !board.replace(note) {
                    return ReconcileOutcome::UnknownNote;
                }
                if let Some(at) = stamp {
                    board.record_applied(id, at);
                }
                ReconcileOutcome::Applied
            }
            ChangeEvent::Deleted(id) => match board.remove(id) {
                Some(_) => ReconcileOutcome::Applied,
                None => ReconcileOutcome::UnknownNote,
            },
        }
    }
}
