use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::geometry::Point;
use crate::core::note::{Note, TrackAttachment, normalize_color, normalize_rotation};

/// Note row as the store serves it. Track fields are flat nullable columns;
/// read responses never carry the edit token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiNote {
    pub id: Uuid,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub to_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub color: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,

    #[serde(default)]
    pub track_id: Option<String>,
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub track_artists: Option<String>,
    #[serde(default)]
    pub track_image: Option<String>,
    #[serde(default)]
    pub track_preview_url: Option<String>,
    #[serde(default)]
    pub track_spotify_url: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ApiNote {
    /// Convert to the domain type, normalizing anything a foreign client may
    /// have written outside the palette or tilt range.
    pub fn into_note(self) -> Note {
        let track = match self.track_id {
            Some(id) => Some(TrackAttachment {
                id,
                name: self.track_name.unwrap_or_default(),
                artists: self.track_artists.unwrap_or_default(),
                image_url: self.track_image,
                preview_url: self.track_preview_url,
                spotify_url: self.track_spotify_url.unwrap_or_default(),
            }),
            None => None,
        };
        Note {
            id: self.id,
            author: self.author,
            recipient: self.to_name,
            message: self.content,
            color: normalize_color(&self.color).to_string(),
            x: self.x,
            y: self.y,
            rotation: normalize_rotation(self.rotation),
            track,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn from_note(note: &Note) -> Self {
        let track = note.track.as_ref();
        Self {
            id: note.id,
            author: note.author.clone(),
            to_name: note.recipient.clone(),
            content: note.message.clone(),
            color: note.color.clone(),
            x: note.x,
            y: note.y,
            rotation: note.rotation,
            track_id: track.map(|t| t.id.clone()),
            track_name: track.map(|t| t.name.clone()),
            track_artists: track.map(|t| t.artists.clone()),
            track_image: track.and_then(|t| t.image_url.clone()),
            track_preview_url: track.and_then(|t| t.preview_url.clone()),
            track_spotify_url: track.map(|t| t.spotify_url.clone()),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// Partial update; only present fields go on the wire.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl NotePatch {
    pub fn position(pos: Point) -> Self {
        Self {
            x: Some(pos.x),
            y: Some(pos.y),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("note not found")]
    NotFound,
    #[error("edit token rejected")]
    NotAllowed,
    #[error("note already exists with a different token")]
    Conflict,
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    notes: Vec<ApiNote>,
}

/// Create round-trip result: the canonical record plus the token the server
/// registered for it (ours, or the original one on an idempotent retry).
#[derive(Debug, Deserialize)]
pub struct CreateResponse {
    pub note: ApiNote,
    #[serde(rename = "editToken")]
    pub edit_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    #[serde(flatten)]
    note: &'a ApiNote,
    #[serde(rename = "editToken")]
    edit_token: &'a str,
}

#[derive(Debug, Serialize)]
struct PatchBody<'a> {
    #[serde(rename = "editToken")]
    edit_token: &'a str,
    patch: &'a NotePatch,
}

/// HTTP client for the note store.
#[derive(Clone)]
pub struct NotesApi {
    base_url: String,
    http: Client,
}

impl NotesApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = Client::builder().build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn notes_url(&self) -> String {
        format!("{}/api/notes", self.base_url)
    }

    fn note_url(&self, id: Uuid) -> String {
        format!("{}/api/notes/{}", self.base_url, id)
    }

    /// List every note on the board. Tokens are never included.
    pub async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        let resp = self.http.get(self.notes_url()).send().await?;
        let resp = check(resp).await?;
        let body: ListResponse = resp.json().await?;
        Ok(body.notes.into_iter().map(ApiNote::into_note).collect())
    }

    /// Create a note. Idempotent on a matching `(id, edit_token)` pair: a
    /// retry returns the existing record instead of erroring; a mismatched
    /// token on an existing id is [`ApiError::Conflict`].
    pub async fn create_note(
        &self,
        note: &Note,
        edit_token: &str,
    ) -> Result<CreateResponse, ApiError> {
        let wire = ApiNote::from_note(note);
        let body = CreateBody {
            note: &wire,
            edit_token,
        };
        let resp = self.http.post(self.notes_url()).json(&body).send().await?;
        let resp = check(resp).await?;
        Ok(resp.json().await?)
    }

    /// Apply a partial update; rejected unless the token matches.
    pub async fn patch_note(
        &self,
        id: Uuid,
        edit_token: &str,
        patch: &NotePatch,
    ) -> Result<(), ApiError> {
        let body = PatchBody { edit_token, patch };
        let resp = self.http.patch(self.note_url(id)).json(&body).send().await?;
        check(resp).await?;
        Ok(())
    }

    /// Delete a note; same authorization rule as patch.
    pub async fn delete_note(&self, id: Uuid, edit_token: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.note_url(id))
            .query(&[("editToken", edit_token)])
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        401 | 403 => ApiError::NotAllowed,
        404 => ApiError::NotFound,
        409 => ApiError::Conflict,
        s => ApiError::Server { status: s, body },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::note::DEFAULT_NOTE_COLOR;

    fn wire_note(track_id: Option<&str>) -> ApiNote {
        ApiNote {
            id: Uuid::new_v4(),
            author: "ana".into(),
            to_name: "ben".into(),
            content: "hi".into(),
            color: "#FFB3BA".into(),
            x: 120.0,
            y: 80.0,
            rotation: 3.0,
            track_id: track_id.map(Into::into),
            track_name: track_id.map(|_| "Song".into()),
            track_artists: track_id.map(|_| "Artist".into()),
            track_image: None,
            track_preview_url: None,
            track_spotify_url: track_id.map(|_| "https://open.spotify.com/track/x".into()),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn track_fields_are_all_or_nothing() {
        assert!(wire_note(None).into_note().track.is_none());
        let with = wire_note(Some("t1")).into_note();
        let track = with.track.unwrap();
        assert_eq!(track.id, "t1");
        assert_eq!(track.name, "Song");
    }

    #[test]
    fn conversion_normalizes_foreign_values() {
        let mut wire = wire_note(None);
        wire.color = "magenta".into();
        wire.rotation = 720.0;
        let note = wire.into_note();
        assert_eq!(note.color, DEFAULT_NOTE_COLOR);
        assert_eq!(note.rotation, 12.0);
    }

    #[test]
    fn note_roundtrips_through_wire_format() {
        let note = wire_note(Some("t9")).into_note();
        let back = ApiNote::from_note(&note).into_note();
        assert_eq!(back, note);
    }

    #[test]
    fn position_patch_serializes_only_coordinates() {
        let patch = NotePatch::position(Point::new(12.5, 34.0));
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "x": 12.5, "y": 34.0 }));
    }

    #[test]
    fn create_body_places_token_beside_note_fields() {
        let note = wire_note(None);
        let body = CreateBody {
            note: &note,
            edit_token: "secret",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["editToken"], "secret");
        assert_eq!(json["to_name"], "ben");
    }
}
