//! Music track lookup against the Spotify Web API.
//!
//! Client-credentials flow with a cached bearer token; the cache refreshes a
//! little before the advertised expiry so an in-flight search never races the
//! cutoff.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

const ACCOUNTS_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Keep result lists small; the picker UI shows a handful anyway.
pub const MAX_RESULTS: usize = 15;
pub const DEFAULT_RESULTS: usize = 10;

const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("track service error {status}: {body}")]
    Service { status: u16, body: String },
}

/// One search result, flattened to what a note attachment needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub id: String,
    pub name: String,
    pub artists: String,
    pub album: String,
    pub image_url: Option<String>,
    pub preview_url: Option<String>,
    pub spotify_url: String,
    pub duration_ms: u64,
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct TrackSearch {
    client_id: String,
    client_secret: String,
    http: Client,
    token: Mutex<Option<CachedToken>>,
}

impl TrackSearch {
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self, TrackError> {
        let http = Client::builder().build()?;
        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            http,
            token: Mutex::new(None),
        })
    }

    /// Text search for tracks. An empty query returns no results without
    /// touching the network; the result count is capped at [`MAX_RESULTS`].
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackSummary>, TrackError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit.clamp(1, MAX_RESULTS);

        let token = self.access_token().await?;
        let limit = limit.to_string();
        let resp = self
            .http
            .get(format!("{}/search", API_BASE))
            .bearer_auth(token)
            .query(&[("type", "track"), ("limit", limit.as_str()), ("q", query)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TrackError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let data: SearchResponse = resp.json().await?;
        Ok(data
            .tracks
            .map(|t| t.items.into_iter().map(summarize).collect())
            .unwrap_or_default())
    }

    async fn access_token(&self) -> Result<String, TrackError> {
        let mut cache = self.token.lock().await;
        let now = Instant::now();

        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > now + TOKEN_EXPIRY_SLACK {
                return Ok(cached.access_token.clone());
            }
        }

        let resp = self
            .http
            .post(ACCOUNTS_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TrackError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let grant: TokenResponse = resp.json().await?;
        let token = grant.access_token.clone();
        *cache = Some(CachedToken {
            access_token: grant.access_token,
            expires_at: now + Duration::from_secs(grant.expires_in),
        });
        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<WireTrack>,
}

#[derive(Debug, Deserialize)]
struct WireTrack {
    id: String,
    name: String,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    duration_ms: u64,
    external_urls: ExternalUrls,
    #[serde(default)]
    artists: Vec<WireArtist>,
    album: WireAlbum,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    #[serde(default)]
    spotify: String,
}

#[derive(Debug, Deserialize)]
struct WireArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireAlbum {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<WireImage>,
}

#[derive(Debug, Deserialize)]
struct WireImage {
    url: String,
}

fn summarize(t: WireTrack) -> TrackSummary {
    TrackSummary {
        id: t.id,
        name: t.name,
        artists: t
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        album: t.album.name,
        image_url: t.album.images.first().map(|i| i.url.clone()),
        preview_url: t.preview_url,
        spotify_url: t.external_urls.spotify,
        duration_ms: t.duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_query_short_circuits() {
        let search = TrackSearch::new("id", "secret").unwrap();
        let results = search.search("   ", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn wire_track_flattens_to_summary() {
        let raw = serde_json::json!({
            "tracks": {
                "items": [{
                    "id": "t1",
                    "name": "Song",
                    "preview_url": null,
                    "duration_ms": 201000,
                    "external_urls": { "spotify": "https://open.spotify.com/track/t1" },
                    "artists": [{ "name": "Ana" }, { "name": "Ben" }],
                    "album": {
                        "name": "Album",
                        "images": [{ "url": "https://img/large" }, { "url": "https://img/small" }]
                    }
                }]
            }
        });
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        let items = parsed.tracks.unwrap().items;
        let summary = summarize(items.into_iter().next().unwrap());

        assert_eq!(summary.artists, "Ana, Ben");
        assert_eq!(summary.image_url.as_deref(), Some("https://img/large"));
        assert!(summary.preview_url.is_none());
        assert_eq!(summary.duration_ms, 201000);
    }

    #[test]
    fn missing_tracks_object_parses_to_none() {
        let parsed: SearchResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(parsed.tracks.is_none());
    }
}
