use std::collections::HashMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Per-device map from note id to edit token, surviving restarts.
///
/// Possession of a token is what makes a note draggable and deletable from
/// this device, so the store is loaded once at startup and written through on
/// every change. A corrupt file resets to an empty map rather than failing.
#[derive(Debug)]
pub struct EditTokenStore {
    path: PathBuf,
    map: HashMap<Uuid, String>,
}

impl EditTokenStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = read_map(&path);
        Self { path, map }
    }

    pub fn get(&self, note_id: Uuid) -> Option<&str> {
        self.map.get(&note_id).map(String::as_str)
    }

    pub fn is_owner(&self, note_id: Uuid) -> bool {
        self.map.contains_key(&note_id)
    }

    pub fn owned_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.map.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn set(&mut self, note_id: Uuid, token: String) {
        self.map.insert(note_id, token);
        self.persist();
    }

    pub fn remove(&mut self, note_id: Uuid) {
        if self.map.remove(&note_id).is_some() {
            self.persist();
        }
    }

    /// Fresh id/token pair for a new note, registered before the create is
    /// sent so a retried POST stays idempotent.
    pub fn mint(&mut self) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let token = Uuid::new_v4().to_string();
        self.set(id, token.clone());
        (id, token)
    }

    fn persist(&self) {
        if let Some(dir) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::warn!("Cannot create token store dir {}: {}", dir.display(), e);
                return;
            }
        }
        let raw = serde_json::to_string(&self.map).expect("token map serializes");
        if let Err(e) = std::fs::write(&self.path, raw) {
            log::warn!("Cannot write token store {}: {}", self.path.display(), e);
        }
    }
}

fn read_map(path: &Path) -> HashMap<Uuid, String> {
    match std::fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Corrupt token store {}: {}", path.display(), e);
            HashMap::new()
        }),
        Err(_) => HashMap::new(),
    }
}
