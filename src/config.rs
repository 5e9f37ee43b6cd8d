use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::overlap::OverlapPolicy;

pub const CONFIG_VERSION: u64 = 1;

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("corkboard")
}

fn default_server_url() -> String {
    "http://localhost:3000".to_string()
}

/// Client configuration. Persisted as JSON in the data directory; a missing
/// or unreadable file falls back to defaults.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BoardConfig {
    /// Base URL of the note store, without a trailing slash.
    pub server_url: String,
    pub data_dir: PathBuf,
    /// Policy used by every placement operation on this deployment.
    pub overlap_policy: OverlapPolicy,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub debug_logging: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            data_dir: default_data_dir(),
            overlap_policy: OverlapPolicy::default(),
            min_zoom: 0.4,
            max_zoom: 2.2,
            zoom_step: 0.1,
            debug_logging: false,
        }
    }
}

impl BoardConfig {
    pub fn config_path() -> PathBuf {
        default_data_dir().join("config.json")
    }

    pub fn tokens_path(&self) -> PathBuf {
        self.data_dir.join("edit_tokens_v1.json")
    }

    /// Load from the default location, falling back to defaults when the file
    /// is missing or malformed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Malformed config at {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.ensure_dirs()?;
        let raw = serde_json::to_string_pretty(self).expect("config serializes");
        std::fs::write(Self::config_path(), raw)
    }

    /// Ensure the data directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = BoardConfig::default();
        assert!(cfg.min_zoom > 0.0);
        assert!(cfg.min_zoom < cfg.max_zoom);
        assert!(!cfg.server_url.ends_with('/'));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("corkboard-no-such-config.json");
        let cfg = BoardConfig::load_from(&path);
        assert_eq!(cfg, BoardConfig::default());
    }

    #[test]
    fn roundtrips_through_json() {
        let cfg = BoardConfig {
            server_url: "https://board.example".into(),
            ..BoardConfig::default()
        };
        let raw = serde_json::to_string(&cfg).unwrap();
        let back: BoardConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, cfg);
    }
}
