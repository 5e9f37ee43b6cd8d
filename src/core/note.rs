use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::{Point, Rect};

/// Note footprint in world pixels. Must match the rendered sticky size.
pub const NOTE_WIDTH: f64 = 240.0;
pub const NOTE_HEIGHT: f64 = 200.0;

pub const ALLOWED_NOTE_COLORS: [&str; 5] =
    ["#FFB3BA", "#F95579", "#FF8AB3", "#FFC4DD", "#FFE5E5"];
pub const DEFAULT_NOTE_COLOR: &str = "#FFE5E5";

pub const ROTATION_MIN: f64 = -12.0;
pub const ROTATION_MAX: f64 = 12.0;

pub const MAX_MESSAGE_LEN: usize = 500;

/// Clamp to the allowed palette; anything unknown becomes the default.
pub fn normalize_color(input: &str) -> &'static str {
    let s = input.trim();
    ALLOWED_NOTE_COLORS
        .iter()
        .copied()
        .find(|c| *c == s)
        .unwrap_or(DEFAULT_NOTE_COLOR)
}

/// Clamp tilt to the visual range; non-finite input becomes 0.
pub fn normalize_rotation(input: f64) -> f64 {
    if !input.is_finite() {
        return 0.0;
    }
    input.clamp(ROTATION_MIN, ROTATION_MAX)
}

/// Music track attached to a note. Either absent entirely or populated from a
/// single search result; the wire format flattens these into nullable columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackAttachment {
    pub id: String,
    pub name: String,
    pub artists: String,
    pub image_url: Option<String>,
    pub preview_url: Option<String>,
    pub spotify_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub author: String,
    pub recipient: String,
    pub message: String,
    pub color: String,
    /// World-pixel origin of the note rectangle.
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub track: Option<TrackAttachment>,
    /// Server-assigned; `None` until the create round-trips.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin(self.origin(), NOTE_WIDTH, NOTE_HEIGHT)
    }

    pub fn set_position(&mut self, pos: Point) {
        self.x = pos.x;
        self.y = pos.y;
    }
}

/// Deterministic tilt in [-5, 5] derived from the id, so a retried create
/// produces the same note.
pub fn tilt_for(id: Uuid) -> f64 {
    let b = id.as_bytes();
    let n = u16::from_le_bytes([b[0], b[1]]);
    (n as f64 / u16::MAX as f64) * 10.0 - 5.0
}

/// User-entered content for a new note, before placement and send.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub author: String,
    pub recipient: String,
    pub message: String,
    pub color: String,
    pub track: Option<TrackAttachment>,
}

impl NoteDraft {
    /// Apply the clamps the server would otherwise reject on: palette color,
    /// capped message length. Returns `None` for an empty message.
    pub fn normalized(mut self) -> Option<Self> {
        if self.message.trim().is_empty() {
            return None;
        }
        if self.message.chars().count() > MAX_MESSAGE_LEN {
            self.message = self.message.chars().take(MAX_MESSAGE_LEN).collect();
        }
        self.color = normalize_color(&self.color).to_string();
        Some(self)
    }
}
