use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use canon_types::Key;

use crate::error::{StoreError, StoreResult};
use crate::traits::{subkeys_of, CanonicalStorage};

/// In-memory storage keyed by [`Key`].
///
/// Intended for tests and embedding. Values are held behind a `RwLock`;
/// `Bytes` makes reads cheap clones.
pub struct InMemoryStorage {
    values: RwLock<HashMap<Key, Bytes>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.values.read().map_err(|_| StoreError::LockPoisoned)?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Every stored key, sorted.
    pub fn keys(&self) -> StoreResult<Vec<Key>> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut keys: Vec<Key> = values.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonicalStorage for InMemoryStorage {
    fn read(&self, key: &Key) -> StoreResult<Bytes> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        values
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn write(&self, key: &Key, data: Bytes) -> StoreResult<()> {
        let mut values = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        values.insert(key.clone(), data);
        Ok(())
    }

    fn delete(&self, key: &Key) -> StoreResult<bool> {
        let mut values = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values.remove(key).is_some())
    }

    fn list_subkeys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(subkeys_of(values.keys().map(Key::as_str), prefix))
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.values.read().map(|v| v.len()).unwrap_or(0);
        f.debug_struct("InMemoryStorage").field("key_count", &count).finish()
    }
}
