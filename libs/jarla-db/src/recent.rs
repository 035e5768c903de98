use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const DEFAULT_RECENT_CAPACITY: usize = 10;

/// Where the recently-viewed id list is kept between runs.
pub trait RecentStore: Send + Sync {
    fn load(&self) -> Result<Vec<String>>;
    fn save(&self, ids: &[String]) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryRecentStore {
    ids: Mutex<Vec<String>>,
}

impl MemoryRecentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecentStore for MemoryRecentStore {
    fn load(&self) -> Result<Vec<String>> {
        let ids = self
            .ids
            .lock()
            .map_err(|_| anyhow::anyhow!("recent store lock poisoned"))?;
        Ok(ids.clone())
    }

    fn save(&self, ids: &[String]) -> Result<()> {
        let mut stored = self
            .ids
            .lock()
            .map_err(|_| anyhow::anyhow!("recent store lock poisoned"))?;
        *stored = ids.to_vec();
        Ok(())
    }
}

/// JSON array of ids in a file. A missing file reads as an empty list.
#[derive(Debug, Clone)]
pub struct JsonFileRecentStore {
    path: PathBuf,
}

impl JsonFileRecentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecentStore for JsonFileRecentStore {
    fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn save(&self, ids: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let contents = serde_json::to_string(ids)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Bounded most-recent-first list of viewed listing ids.
pub struct RecentlyViewed<S> {
    store: S,
    capacity: usize,
}

impl<S: RecentStore> RecentlyViewed<S> {
    pub fn new(store: S, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ids(&self) -> Result<Vec<String>> {
        let mut ids = self.store.load()?;
        ids.truncate(self.capacity);
        Ok(ids)
    }

    /// Moves `id` to the front, evicting the oldest entry past capacity.
    pub fn record(&self, id: &str) -> Result<Vec<String>> {
        let mut ids = self.store.load()?;
        ids.retain(|existing| existing != id);
        ids.insert(0, id.to_string());
        ids.truncate(self.capacity);
        self.store.save(&ids)?;
        Ok(ids)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.save(&[])
    }
}
