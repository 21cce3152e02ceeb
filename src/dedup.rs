//! Processed-item tracking and its durable JSON store.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::DedupError;

/// Default number of ids retained.
pub const DEFAULT_RETENTION: usize = 300;

/// Insertion-ordered set of processed item ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Insert `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push_back(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Evict the oldest ids until at most `max` remain. Returns the number evicted.
    pub fn truncate_to(&mut self, max: usize) -> usize {
        let mut evicted = 0;
        while self.order.len() > max {
            if let Some(old) = self.order.pop_front() {
                self.members.remove(&old);
                evicted += 1;
            }
        }
        evicted
    }

    /// Ids oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn newest(&self) -> Option<&str> {
        self.order.back().map(String::as_str)
    }
}

impl FromIterator<String> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Durable storage for the processed set.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Load stored ids. Missing or unreadable storage yields an empty set.
    async fn load(&self) -> ProcessedSet;

    /// Replace stored ids with `set`.
    async fn save(&self, set: &ProcessedSet) -> Result<(), DedupError>;
}

/// JSON-array file store. Saves go through a temp file and a rename.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> DedupError {
        DedupError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl DedupStore for JsonFileStore {
    async fn load(&self) -> ProcessedSet {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No processed-id file yet");
                return ProcessedSet::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read processed ids");
                return ProcessedSet::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Corrupt processed-id file; starting empty"
                );
                ProcessedSet::new()
            }
        }
    }

    async fn save(&self, set: &ProcessedSet) -> Result<(), DedupError> {
        let ids: Vec<&str> = set.iter().collect();
        let json = serde_json::to_string(&ids)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, json).await.map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).await.map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), count = ids.len(), "Saved processed ids");
        Ok(())
    }
}
