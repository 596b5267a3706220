//! The Registry Store (SPEC_FULL.md §4.1) — a durable `threadId -> Session`
//! map on a shared filesystem path, mutated under an advisory file lock.
//! Readable and writable by the bridge and by out-of-process hook scripts,
//! so every write goes through the lock file + atomic rename path even
//! though only this process links against this module.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};
use tempfile::NamedTempFile;

use crate::model::Session;

/// A handle on the on-disk registry. Cheap to clone-construct (just two
/// paths); all state lives on disk.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    data_path: PathBuf,
    lock_path: PathBuf,
}

type RegistryMap = HashMap<String, Session>;

impl RegistryStore {
    pub fn new(data_path: PathBuf, lock_path: PathBuf) -> Self {
        Self { data_path, lock_path }
    }

    pub fn at_default_location() -> anyhow::Result<Self> {
        let dir = crate::paths::registry_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(Self::new(crate::paths::registry_path(), crate::paths::registry_lock_path()))
    }

    /// Load the current map. Never fails on a missing or corrupt file —
    /// both are treated as "empty registry", logged, and returned so a
    /// caller can't accidentally bring the process down over a hook script
    /// racing a write.
    pub fn load(&self) -> RegistryMap {
        let contents = match std::fs::read_to_string(&self.data_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RegistryMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.data_path.display(), error = %e, "failed to read registry file");
                return RegistryMap::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(path = %self.data_path.display(), error = %e, "registry file is not valid JSON, treating as empty");
                RegistryMap::new()
            }
        }
    }

    pub fn get(&self, thread_id: &str) -> Option<Session> {
        self.load().get(thread_id).cloned()
    }

    /// Acquire the lock, load, apply `f` to the map, write back, release.
    /// `f` must be pure/fast — no chat or muxer I/O inside the critical
    /// section (SPEC_FULL.md §4.1).
    pub fn update<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut RegistryMap) -> T,
    {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new().create(true).write(true).open(&self.lock_path)?;
        let _locked = Flock::lock(lock_file, FlockArg::LockExclusive)
            .map_err(|(_file, errno)| anyhow::anyhow!("flock on {:?} failed: {errno}", self.lock_path))?;

        let mut map = self.load();
        let result = f(&mut map);
        self.write_atomic(&map)?;
        Ok(result)
        // _locked dropped here, releasing the advisory lock.
    }

    pub fn put(&self, session: Session) -> anyhow::Result<()> {
        self.update(|map| {
            map.insert(session.thread_id.clone(), session);
        })
    }

    pub fn delete(&self, thread_id: &str) -> anyhow::Result<Option<Session>> {
        self.update(|map| map.remove(thread_id))
    }

    /// Serialize to a temp file in the registry's own directory, then
    /// rename into place — atomic swap, no reader ever observes a partial
    /// write.
    fn write_atomic(&self, map: &RegistryMap) -> anyhow::Result<()> {
        let dir = self
            .data_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("registry path {:?} has no parent directory", self.data_path))?;
        std::fs::create_dir_all(dir)?;
        let body = serde_json::to_string_pretty(map)?;
        let tmp = NamedTempFile::new_in(dir)?;
        std::fs::write(tmp.path(), body)?;
        tmp.persist(&self.data_path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
