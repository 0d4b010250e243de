//! Save-blob repositories.
//!
//! The manager produces opaque blobs; repositories store them by slot name.
//! In-memory for tests and quick matches, file-backed for real saves.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("save slot '{0}' not found")]
    NotFound(String),

    #[error("repository lock poisoned")]
    LockPoisoned,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Storage for save blobs, keyed by slot.
pub trait SaveRepository: Send + Sync {
    fn store(&self, slot: &str, blob: &[u8]) -> Result<()>;
    fn fetch(&self, slot: &str) -> Result<Vec<u8>>;
    fn exists(&self, slot: &str) -> bool;
    fn delete(&self, slot: &str) -> Result<()>;
}

/// In-memory implementation for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemorySaveRepo {
    slots: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySaveRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveRepository for InMemorySaveRepo {
    fn store(&self, slot: &str, blob: &[u8]) -> Result<()> {
        let mut slots = self.slots.write().map_err(|_| RepositoryError::LockPoisoned)?;
        slots.insert(slot.to_string(), blob.to_vec());
        Ok(())
    }

    fn fetch(&self, slot: &str) -> Result<Vec<u8>> {
        let slots = self.slots.read().map_err(|_| RepositoryError::LockPoisoned)?;
        slots
            .get(slot)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(slot.to_string()))
    }

    fn exists(&self, slot: &str) -> bool {
        self.slots
            .read()
            .map(|slots| slots.contains_key(slot))
            .unwrap_or(false)
    }

    fn delete(&self, slot: &str) -> Result<()> {
        let mut slots = self.slots.write().map_err(|_| RepositoryError::LockPoisoned)?;
        slots
            .remove(slot)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(slot.to_string()))
    }
}

/// One file per slot under a base directory.
#[derive(Debug)]
pub struct FileSaveRepo {
    base_dir: PathBuf,
}

impl FileSaveRepo {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, slot: &str) -> PathBuf {
        self.base_dir.join(format!("{slot}.save.json"))
    }
}

impl SaveRepository for FileSaveRepo {
    fn store(&self, slot: &str, blob: &[u8]) -> Result<()> {
        // Write-then-rename so a crash mid-write never corrupts the slot.
        let path = self.path_for(slot);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn fetch(&self, slot: &str) -> Result<Vec<u8>> {
        let path = self.path_for(slot);
        if !path.exists() {
            return Err(RepositoryError::NotFound(slot.to_string()));
        }
        Ok(std::fs::read(path)?)
    }

    fn exists(&self, slot: &str) -> bool {
        self.path_for(slot).exists()
    }

    fn delete(&self, slot: &str) -> Result<()> {
        let path = self.path_for(slot);
        if !path.exists() {
            return Err(RepositoryError::NotFound(slot.to_string()));
        }
        Ok(std::fs::remove_file(path)?)
    }
}
