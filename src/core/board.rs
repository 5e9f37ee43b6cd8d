use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::geometry::{Point, Rect};
use super::note::Note;

/// Client-local view of the shared note collection, plus the transient
/// bookkeeping the reconciler and drag logic need.
///
/// Mutated by exactly three producers, all on the same event loop: local
/// optimistic writes, the realtime reconciler, and the per-frame flush of the
/// pending drag position.
#[derive(Debug, Default)]
pub struct BoardState {
    notes: Vec<Note>,
    /// At most one note is dragged locally at a time.
    dragging: Option<Uuid>,
    /// Newest server timestamp applied per note; stale events lose to it.
    last_applied: HashMap<Uuid, DateTime<Utc>>,
    /// When this client last moved each note locally.
    last_local_move: HashMap<Uuid, Instant>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn note(&self, id: Uuid) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Append unless a note with this id is already present. Keeps the
    /// optimistic insert and its realtime echo from duplicating.
    pub fn insert_unique(&mut self, note: Note) -> bool {
        if self.notes.iter().any(|n| n.id == note.id) {
            return false;
        }
        self.notes.push(note);
        true
    }

    /// Replace the stored note wholesale (remote update).
    pub fn replace(&mut self, note: Note) -> bool {
        match self.notes.iter_mut().find(|n| n.id == note.id) {
            Some(slot) => {
                *slot = note;
                true
            }
            None => false,
        }
    }

    /// Remove a note and purge its bookkeeping.
    pub fn remove(&mut self, id: Uuid) -> Option<Note> {
        let idx = self.notes.iter().position(|n| n.id == id)?;
        self.last_applied.remove(&id);
        self.last_local_move.remove(&id);
        if self.dragging == Some(id) {
            self.dragging = None;
        }
        Some(self.notes.remove(idx))
    }

    pub fn apply_position(&mut self, id: Uuid, pos: Point) -> bool {
        match self.notes.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.set_position(pos);
                true
            }
            None => false,
        }
    }

    /// Rectangles of every note except `exclude`, for placement checks.
    pub fn rects_excluding(&self, exclude: Uuid) -> Vec<Rect> {
        self.notes
            .iter()
            .filter(|n| n.id != exclude)
            .map(|n| n.rect())
            .collect()
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.notes.iter().map(|n| n.rect()).collect()
    }

    pub fn dragging(&self) -> Option<Uuid> {
        self.dragging
    }

    pub fn set_dragging(&mut self, id: Option<Uuid>) {
        self.dragging = id;
    }

    pub fn mark_local_move(&mut self, id: Uuid, now: Instant) {
        self.last_local_move.insert(id, now);
    }

    pub fn last_local_move(&self, id: Uuid) -> Option<Instant> {
        self.last_local_move.get(&id).copied()
    }

    pub fn record_applied(&mut self, id: Uuid, at: DateTime<Utc>) {
        self.last_applied.insert(id, at);
    }

    pub fn last_applied(&self, id: Uuid) -> Option<DateTime<Utc>> {
        self.last_applied.get(&id).copied()
    }

    /// Case-insensitive author/recipient filter; a blank query matches all.
    pub fn filter(&self, query: &str) -> Vec<&Note> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.notes.iter().collect();
        }
        self.notes
            .iter()
            .filter(|n| {
                n.author.to_lowercase().contains(&query)
                    || n.recipient.to_lowercase().contains(&query)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_note(author: &str, recipient: &str) -> Note {
        Note {
            id: Uuid::new_v4(),
            author: author.into(),
            recipient: recipient.into(),
            message: "hi".into(),
            color: "#FFE5E5".into(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            track: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn insert_unique_deduplicates_by_id() {
        let mut board = BoardState::new();
        let note = make_note("ana", "ben");
        assert!(board.insert_unique(note.clone()));
        assert!(!board.insert_unique(note));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn remove_purges_bookkeeping() {
        let mut board = BoardState::new();
        let note = make_note("ana", "ben");
        let id = note.id;
        board.insert_unique(note);
        board.record_applied(id, Utc::now());
        board.mark_local_move(id, Instant::now());
        board.set_dragging(Some(id));

        board.remove(id).unwrap();

        assert!(board.note(id).is_none());
        assert!(board.last_applied(id).is_none());
        assert!(board.last_local_move(id).is_none());
        assert!(board.dragging().is_none());
    }

    #[test]
    fn filter_matches_author_or_recipient() {
        let mut board = BoardState::new();
        board.insert_unique(make_note("Ana", "Ben"));
        board.insert_unique(make_note("Cleo", "ana banana"));
        board.insert_unique(make_note("Dee", "Eve"));

        assert_eq!(board.filter("ana").len(), 2);
        assert_eq!(board.filter("EVE").len(), 1);
        assert_eq!(board.filter("  ").len(), 3);
        assert!(board.filter("zzz").is_empty());
    }

    #[test]
    fn rects_excluding_skips_the_given_note() {
        let mut board = BoardState::new();
        let a = make_note("a", "b");
        let a_id = a.id;
        board.insert_unique(a);
        board.insert_unique(make_note("c", "d"));

        assert_eq!(board.rects_excluding(a_id).len(), 1);
        assert_eq!(board.rects().len(), 2);
    }
}
