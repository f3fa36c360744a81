//! On-disk snapshot of the board list.
//!
//! Written whenever a fresh board list is fetched and read opportunistically
//! to turn a board id into a display name (or back). Nothing depends on it
//! for correctness.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::models::Board;
use crate::Result;

/// Board-list cache file.
#[derive(Debug, Clone)]
pub struct BoardCache {
    path: PathBuf,
}

impl BoardCache {
    /// Cache backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the cache with `boards`.
    pub fn save(&self, boards: &[Board]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(boards)?;
        fs::write(&self.path, json)?;
        debug!("Cached {} boards to {}", boards.len(), self.path.display());
        Ok(())
    }

    /// Load the cached boards, `None` when there is no cache yet.
    pub fn load(&self) -> Result<Option<Vec<Board>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Cached boards, treating any read failure as an empty cache.
    fn load_lenient(&self) -> Vec<Board> {
        match self.load() {
            Ok(boards) => boards.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable board cache: {}", e);
                Vec::new()
            }
        }
    }

    /// Display name of the board with `id`.
    pub fn resolve_name(&self, id: &str) -> Option<String> {
        self.load_lenient()
            .into_iter()
            .find(|b| b.id == id)
            .map(|b| b.name)
    }

    /// Id of the board named `name`.
    pub fn resolve_id(&self, name: &str) -> Option<String> {
        self.load_lenient()
            .into_iter()
            .find(|b| b.name == name)
            .map(|b| b.id)
    }
}
