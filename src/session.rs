//! Top-level board controller.
//!
//! Owns the note state, viewport, drag controller, reconciler, API client,
//! and token store, and turns pointer and network callbacks into local state
//! changes and outbound requests. Everything runs on the host event loop; the
//! only spawned work is fire-and-forget position sends.

use std::time::Instant;

use futures::{Stream, StreamExt};
use thiserror::Error;
use uuid::Uuid;

use crate::config::BoardConfig;
use crate::core::board::BoardState;
use crate::core::drag::DragController;
use crate::core::geometry::Point;
use crate::core::note::{NOTE_HEIGHT, NOTE_WIDTH, Note, NoteDraft, tilt_for};
use crate::core::placement::find_position;
use crate::core::viewport::Viewport;
use crate::sync::ChangeEvent;
use crate::sync::api::{ApiError, NotePatch, NotesApi};
use crate::sync::reconcile::{ReconcileOutcome, Reconciler};
use crate::sync::tokens::EditTokenStore;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message is required")]
    EmptyMessage,
    #[error("no edit token for this note on this device")]
    NotOwner,
    #[error("data dir unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct BoardSession {
    config: BoardConfig,
    api: NotesApi,
    tokens: EditTokenStore,
    reconciler: Reconciler,
    drag: DragController,
    pub board: BoardState,
    pub viewport: Viewport,
}

impl BoardSession {
    pub fn new(
        config: BoardConfig,
        viewport_width: f64,
        viewport_height: f64,
    ) -> Result<Self, SessionError> {
        config.ensure_dirs()?;
        let api = NotesApi::new(&config.server_url)?;
        let tokens = EditTokenStore::open(config.tokens_path());
        let viewport = Viewport::new(
            viewport_width,
            viewport_height,
            config.min_zoom,
            config.max_zoom,
            config.zoom_step,
        );
        Ok(Self {
            config,
            api,
            tokens,
            reconciler: Reconciler::new(),
            drag: DragController::new(),
            board: BoardState::new(),
            viewport,
        })
    }

    /// Replace local state with the server's current listing.
    pub async fn load(&mut self) -> Result<usize, SessionError> {
        let notes = self.api.list_notes().await?;
        self.board = BoardState::new();
        for note in notes {
            let id = note.id;
            if let Some(at) = note.updated_at.or(note.created_at) {
                self.board.record_applied(id, at);
            }
            self.board.insert_unique(note);
        }
        log::info!("Loaded {} notes from {}", self.board.len(), self.config.server_url);
        Ok(self.board.len())
    }

    pub fn is_owner(&self, note_id: Uuid) -> bool {
        self.tokens.is_owner(note_id)
    }

    /// Notes on the board this device holds a token for.
    pub fn owned_note_ids(&self) -> Vec<Uuid> {
        self.tokens
            .owned_ids()
            .filter(|id| self.board.note(*id).is_some())
            .collect()
    }

    pub fn filter_notes(&self, query: &str) -> Vec<&Note> {
        self.board.filter(query)
    }

    // ----- note creation -----

    /// Post a new note near the current viewport center.
    ///
    /// The id/token pair is registered before the request goes out, which
    /// keeps a retried create idempotent; on failure the registration is
    /// rolled back and the error surfaces to the caller.
    pub async fn create_note(&mut self, draft: NoteDraft) -> Result<Uuid, SessionError> {
        let draft = draft.normalized().ok_or(SessionError::EmptyMessage)?;

        let (id, token) = self.tokens.mint();

        let center = self.viewport.center_world();
        let anchor = Point::new(center.x - NOTE_WIDTH / 2.0, center.y - NOTE_HEIGHT / 2.0);
        let position = find_position(&self.board.rects(), anchor, self.config.overlap_policy);

        let note = Note {
            id,
            author: draft.author,
            recipient: draft.recipient,
            message: draft.message,
            color: draft.color,
            x: position.x,
            y: position.y,
            rotation: tilt_for(id),
            track: draft.track,
            created_at: None,
            updated_at: None,
        };

        match self.api.create_note(&note, &token).await {
            Ok(resp) => {
                // The server echoes the registered token; on an idempotent
                // retry it may be the original one.
                if let Some(t) = resp.edit_token {
                    self.tokens.set(id, t);
                }
                let canonical = resp.note.into_note();
                if let Some(at) = canonical.updated_at.or(canonical.created_at) {
                    self.board.record_applied(id, at);
                }
                // The realtime insert will arrive too; dedup by id.
                self.board.insert_unique(canonical);
                Ok(id)
            }
            Err(e) => {
                log::error!("Create failed for {}: {}", id, e);
                self.tokens.remove(id);
                Err(e.into())
            }
        }
    }

    // ----- drag lifecycle -----

    /// Start dragging a note, if this device owns it. A drag already in
    /// progress is concluded first; only one runs at a time.
    pub fn begin_drag(&mut self, note_id: Uuid, pointer_screen: Point, now: Instant) -> bool {
        if !self.tokens.is_owner(note_id) {
            return false;
        }
        let Some(origin) = self.board.note(note_id).map(Note::origin) else {
            return false;
        };
        if self.drag.dragging().is_some() {
            self.end_drag(now);
        }
        let pointer_world = self.viewport.screen_to_world(pointer_screen);
        self.drag.begin(note_id, origin, pointer_world, pointer_screen);
        self.board.set_dragging(Some(note_id));
        true
    }

    /// Route pointer movement to the active drag or pan gesture.
    pub fn pointer_move(&mut self, pointer_screen: Point, now: Instant) {
        if let Some(note_id) = self.drag.dragging() {
            let pointer_world = self.viewport.screen_to_world(pointer_screen);
            let send = self.drag.motion(pointer_world, pointer_screen, now);
            self.board.mark_local_move(note_id, now);
            if let Some(send) = send {
                self.send_position(send.note_id, send.position);
            }
        } else if self.viewport.is_panning() {
            self.viewport.pan_move(pointer_screen);
        }
    }

    /// Flush the coalesced drag position for this animation frame.
    pub fn frame(&mut self) {
        if let Some((note_id, position)) = self.drag.take_frame() {
            self.board.apply_position(note_id, position);
        }
    }

    /// Conclude both gestures on pointer-up or pointer-cancel.
    pub fn pointer_up(&mut self, now: Instant) {
        self.viewport.end_pan();
        self.end_drag(now);
    }

    /// Conclude the active drag: flush, snap away from heavy overlap, commit.
    pub fn end_drag(&mut self, now: Instant) {
        let Some(outcome) = self.drag.release(now) else {
            return;
        };
        self.board.set_dragging(None);

        if let Some(pending) = outcome.pending {
            self.board.apply_position(outcome.note_id, pending);
        }

        if !outcome.moved {
            return;
        }
        let Some(raw) = outcome.release_position else {
            return;
        };

        let others = self.board.rects_excluding(outcome.note_id);
        let committed = find_position(&others, raw, self.config.overlap_policy);
        self.board.apply_position(outcome.note_id, committed);
        // Re-mark so a stale echo of this very move cannot snap the note back.
        self.board.mark_local_move(outcome.note_id, now);
        self.send_position(outcome.note_id, committed);
    }

    /// Whether a click on this note should open it, or is just the tail end
    /// of a drag.
    pub fn should_open_note(&self, note_id: Uuid, now: Instant) -> bool {
        !self.drag.recently_finished(note_id, now)
    }

    /// Fire-and-forget position sync. Failures are logged and swallowed; a
    /// later send supersedes whatever was lost.
    fn send_position(&self, note_id: Uuid, position: Point) {
        let Some(token) = self.tokens.get(note_id) else {
            return;
        };
        let api = self.api.clone();
        let token = token.to_string();
        tokio::spawn(async move {
            let patch = NotePatch::position(position);
            if let Err(e) = api.patch_note(note_id, &token, &patch).await {
                log::debug!("Position sync for {} dropped: {}", note_id, e);
            }
        });
    }

    // ----- deletion -----

    /// Delete an owned note, optimistically removing it locally and putting
    /// it back if the server refuses.
    pub async fn delete_note(&mut self, note_id: Uuid) -> Result<(), SessionError> {
        let Some(token) = self.tokens.get(note_id).map(String::from) else {
            return Err(SessionError::NotOwner);
        };

        let removed = self.board.remove(note_id);
        match self.api.delete_note(note_id, &token).await {
            Ok(()) => {
                self.tokens.remove(note_id);
                Ok(())
            }
            Err(e) => {
                log::error!("Delete failed for {}: {}", note_id, e);
                if let Some(note) = removed {
                    self.board.insert_unique(note);
                }
                Err(e.into())
            }
        }
    }

    // ----- realtime -----

    pub fn handle_event(&mut self, event: ChangeEvent, now: Instant) -> ReconcileOutcome {
        let id = event.note_id();
        let outcome = self.reconciler.apply(&mut self.board, event, now);
        if !outcome.applied() {
            log::debug!("Dropped realtime event for {}: {:?}", id, outcome);
        }
        outcome
    }

    /// Pump the change feed until the transport closes it.
    pub async fn run_feed(&mut self, mut feed: impl Stream<Item = ChangeEvent> + Unpin) {
        while let Some(event) = feed.next().await {
            self.handle_event(event, Instant::now());
        }
        log::info!("Change feed closed");
    }

    // ----- pan/zoom passthrough -----

    /// Begin a background pan; ignored while a note drag is active.
    pub fn begin_pan(&mut self, pointer_screen: Point) {
        if self.drag.dragging().is_none() {
            self.viewport.begin_pan(pointer_screen);
        }
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn zoom_reset(&mut self) {
        self.viewport.zoom_reset();
    }
}
