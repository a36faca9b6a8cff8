use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::bus::ChangeBus;
use crate::classify::FileCategory;
use crate::records::{Dispatcher, FileGrade};

/// Fixed key under which the whole dispatcher collection is persisted.
pub const DISPATCHERS_KEY: &str = "dispatchers";

/// Flat durable key-value contract. The aggregate store serializes the full
/// dispatcher collection as a single value under `DISPATCHERS_KEY` on every
/// read and write.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// File-backed store: one JSON file per key under the data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read store file {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory {}", self.dir.display()))?;
        let path = self.key_path(key);
        // Write atomically: temp then rename, so a reader never sees a
        // half-written collection.
        let tmp_path = self.dir.join(format!(".{}.json.tmp", key));
        std::fs::write(&tmp_path, value)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable per-dispatcher aggregate records behind an injected key-value
/// store. Every mutation is a full read-modify-write of the collection, so
/// callers must serialize mutations (the upload pipeline is strictly
/// sequential for exactly this reason).
pub struct AggregateStore {
    store: Box<dyn KeyValueStore>,
    bus: ChangeBus,
}

impl AggregateStore {
    pub fn new(store: Box<dyn KeyValueStore>, bus: ChangeBus) -> Self {
        Self { store, bus }
    }

    /// Load the full dispatcher collection. A missing key is an empty
    /// collection; a corrupt value is an error.
    pub fn load(&self) -> Result<Vec<Dispatcher>> {
        match self.store.get(DISPATCHERS_KEY)? {
            Some(raw) => {
                serde_json::from_str(&raw).context("Corrupt dispatcher collection in store")
            }
            None => Ok(Vec::new()),
        }
    }

    pub fn find(&self, name: &str) -> Result<Option<Dispatcher>> {
        Ok(self.load()?.into_iter().find(|d| d.name == name))
    }

    fn save(&mut self, dispatchers: &[Dispatcher]) -> Result<()> {
        let raw = serde_json::to_string(dispatchers)?;
        self.store.set(DISPATCHERS_KEY, &raw)
    }

    /// Append `filename` to the dispatcher's transcript or audio list if not
    /// already present, creating the dispatcher on first reference. Emits one
    /// change notification.
    pub fn upsert_file(
        &mut self,
        dispatcher_name: &str,
        filename: &str,
        category: FileCategory,
    ) -> Result<()> {
        let mut all = self.load()?;
        let dispatcher = find_or_create(&mut all, dispatcher_name);
        let list = match category {
            FileCategory::Transcript => &mut dispatcher.transcript_files,
            FileCategory::Audio => &mut dispatcher.audio_files,
        };
        if !list.iter().any(|f| f == filename) {
            list.push(filename.to_string());
        }
        self.save(&all)?;
        self.bus.notify();
        Ok(())
    }

    /// Record a grading attempt for `filename`. `Some` attaches a grade,
    /// `None` records "attempted, no grade available"; both overwrite any
    /// previous entry. Emits one change notification.
    pub fn attach_grade(
        &mut self,
        dispatcher_name: &str,
        filename: &str,
        grade: Option<FileGrade>,
    ) -> Result<()> {
        let mut all = self.load()?;
        let dispatcher = find_or_create(&mut all, dispatcher_name);
        dispatcher.grades.insert(filename.to_string(), grade);
        self.save(&all)?;
        self.bus.notify();
        Ok(())
    }
}

fn find_or_create<'a>(all: &'a mut Vec<Dispatcher>, name: &str) -> &'a mut Dispatcher {
    if let Some(i) = all.iter().position(|d| d.name == name) {
        &mut all[i]
    } else {
        all.push(Dispatcher::new(name));
        all.last_mut().expect("just pushed")
    }
}
