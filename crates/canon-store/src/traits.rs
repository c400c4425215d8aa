use bytes::Bytes;
use canon_crypto::Checksum;
use canon_integrity::{IntegrityEntry, IntegrityError, Manifest};
use canon_record::RecordStream;
use canon_types::{ContentType, Key};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Key-addressed storage for the canonical record.
///
/// Backends provide four raw byte operations; entry and manifest handling
/// is layered on top of them. All implementations must satisfy these
/// invariants:
/// - A key maps to at most one value; writing a key replaces its value.
/// - Reading an absent key fails with [`StoreError::NotFound`].
/// - Writes are idempotent by key.
/// - All I/O errors are propagated, never silently ignored.
pub trait CanonicalStorage: Send + Sync {
    /// Raw bytes stored under a key.
    fn read(&self, key: &Key) -> StoreResult<Bytes>;

    /// Store raw bytes under a key, replacing any previous value.
    fn write(&self, key: &Key, data: Bytes) -> StoreResult<()>;

    /// Remove a key. Returns `true` if it existed.
    fn delete(&self, key: &Key) -> StoreResult<bool>;

    /// Names directly beneath a key prefix, sorted.
    ///
    /// For keys `a/b/c.json` and `a/d.json`, the subkeys of `a` are `b` and
    /// `d.json`.
    fn list_subkeys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    fn exists(&self, key: &Key) -> StoreResult<bool> {
        match self.read(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Persist a leaf entry, checking its content against its checksum.
    fn store_entry(&self, entry: &IntegrityEntry) -> StoreResult<()> {
        let data = entry.stream.bytes()?;
        let actual = Checksum::of_bytes(&data);
        if &actual != entry.checksum() {
            return Err(IntegrityError::Validation {
                key: entry.key.to_string(),
                expected: entry.checksum().to_string(),
                actual: actual.to_string(),
            }
            .into());
        }
        debug!(key = %entry.key, checksum = %actual, len = data.len(), "storing entry");
        self.write(&entry.key, data)
    }

    /// Load an entry and the checksum of its stored bytes.
    fn load_entry(&self, key: &Key) -> StoreResult<(RecordStream, Checksum)> {
        let data = self.read(key)?;
        let checksum = Checksum::of_bytes(&data);
        Ok((RecordStream::from_bytes(data, infer_content_type(key)), checksum))
    }

    fn load_manifest(&self, key: &Key) -> StoreResult<Manifest> {
        let data = self.read(key)?;
        serde_json::from_slice(&data).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Persist a manifest. Manifests with unresolved entries are refused.
    fn store_manifest(&self, key: &Key, manifest: &Manifest) -> StoreResult<()> {
        manifest.ensure_complete()?;
        let data = serde_json::to_vec_pretty(manifest).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        debug!(key = %key, entries = manifest.len(), "storing manifest");
        self.write(key, Bytes::from(data))
    }
}

/// Content type implied by a key's extension; opaque bitstreams default to
/// `targz`.
pub fn infer_content_type(key: &Key) -> ContentType {
    let filename = key.filename();
    ContentType::ALL
        .into_iter()
        .find(|ct| filename.ends_with(&format!(".{}", ct.ext())))
        .unwrap_or(ContentType::Targz)
}

/// Immediate children of `prefix` among `keys`, sorted and deduplicated.
pub(crate) fn subkeys_of<'a>(keys: impl IntoIterator<Item = &'a str>, prefix: &str) -> Vec<String> {
    let prefix = prefix.trim_matches('/');
    let mut names: Vec<String> = keys
        .into_iter()
        .filter_map(|key| {
            let rest = if prefix.is_empty() {
                key
            } else {
                key.strip_prefix(prefix)?.strip_prefix('/')?
            };
            rest.split('/').next().filter(|name| !name.is_empty()).map(str::to_string)
        })
        .collect();
    names.sort();
    names.dedup();
    names
}
