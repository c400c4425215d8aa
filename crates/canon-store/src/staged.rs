use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use canon_types::Key;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::{subkeys_of, CanonicalStorage};

#[derive(Clone, Debug)]
enum Pending {
    Write(Bytes),
    Delete,
}

/// Buffers writes and deletes over a base storage until committed.
///
/// Reads see pending changes first and fall through to the base. Dropping
/// or [`discard`](Self::discard)ing the overlay leaves the base untouched.
pub struct StagedStorage {
    base: Arc<dyn CanonicalStorage>,
    pending: Mutex<BTreeMap<Key, Pending>>,
}

impl StagedStorage {
    pub fn new(base: Arc<dyn CanonicalStorage>) -> Self {
        Self {
            base,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn base(&self) -> &Arc<dyn CanonicalStorage> {
        &self.base
    }

    /// Number of keys with pending changes.
    pub fn pending_len(&self) -> StoreResult<usize> {
        Ok(self.pending.lock().map_err(|_| StoreError::LockPoisoned)?.len())
    }

    /// Apply every pending change to the base, in key order.
    ///
    /// Returns the number of keys changed. Pending changes are cleared only
    /// once all of them have been applied.
    pub fn commit(&self) -> StoreResult<usize> {
        let mut pending = self.pending.lock().map_err(|_| StoreError::LockPoisoned)?;
        for (key, change) in pending.iter() {
            match change {
                Pending::Write(data) => self.base.write(key, data.clone())?,
                Pending::Delete => {
                    self.base.delete(key)?;
                }
            }
        }
        let applied = pending.len();
        pending.clear();
        info!(keys = applied, "committed staged changes");
        Ok(applied)
    }

    pub fn discard(&self) -> StoreResult<()> {
        let mut pending = self.pending.lock().map_err(|_| StoreError::LockPoisoned)?;
        debug!(keys = pending.len(), "discarding staged changes");
        pending.clear();
        Ok(())
    }
}

impl CanonicalStorage for StagedStorage {
    fn read(&self, key: &Key) -> StoreResult<Bytes> {
        let staged = self
            .pending
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .get(key)
            .cloned();
        match staged {
            Some(Pending::Write(data)) => Ok(data),
            Some(Pending::Delete) => Err(StoreError::NotFound(key.to_string())),
            None => self.base.read(key),
        }
    }

    fn write(&self, key: &Key, data: Bytes) -> StoreResult<()> {
        let mut pending = self.pending.lock().map_err(|_| StoreError::LockPoisoned)?;
        pending.insert(key.clone(), Pending::Write(data));
        Ok(())
    }

    fn delete(&self, key: &Key) -> StoreResult<bool> {
        let existed = self.exists(key)?;
        let mut pending = self.pending.lock().map_err(|_| StoreError::LockPoisoned)?;
        pending.insert(key.clone(), Pending::Delete);
        Ok(existed)
    }

    fn list_subkeys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let pending = self.pending.lock().map_err(|_| StoreError::LockPoisoned)?;
        let written: Vec<&str> = pending
            .iter()
            .filter(|(_, change)| matches!(change, Pending::Write(_)))
            .map(|(key, _)| key.as_str())
            .collect();
        let mut names = subkeys_of(written, prefix);
        for name in self.base.list_subkeys(prefix)? {
            let full = if prefix.trim_matches('/').is_empty() {
                Key::new(name.as_str())
            } else {
                Key::new(format!("{}/{}", prefix.trim_matches('/'), name))
            };
            // A deleted leaf disappears; a directory with deletions beneath
            // it is still listed.
            if !matches!(pending.get(&full), Some(Pending::Delete)) {
                names.push(name);
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

impl std::fmt::Debug for StagedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.pending.lock().map(|p| p.len()).unwrap_or(0);
        f.debug_struct("StagedStorage").field("pending", &pending).finish()
    }
}
