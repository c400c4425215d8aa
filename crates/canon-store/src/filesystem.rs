use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use canon_types::Key;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::CanonicalStorage;

/// Storage rooted at a local directory; each key is a relative file path.
///
/// Writes go to a sibling `.partial` file that is renamed into place, so a
/// reader never sees a half-written value.
#[derive(Clone, Debug)]
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn io_error(key: &str, source: std::io::Error) -> StoreError {
        if source.kind() == ErrorKind::NotFound {
            StoreError::NotFound(key.to_string())
        } else {
            StoreError::Io {
                key: key.to_string(),
                source,
            }
        }
    }
}

impl CanonicalStorage for FilesystemStorage {
    fn read(&self, key: &Key) -> StoreResult<Bytes> {
        let path = self.path_for(key.as_str());
        debug!(path = %path.display(), "reading key");
        std::fs::read(&path)
            .map(Bytes::from)
            .map_err(|e| Self::io_error(key.as_str(), e))
    }

    fn write(&self, key: &Key, data: Bytes) -> StoreResult<()> {
        let path = self.path_for(key.as_str());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Self::io_error(key.as_str(), e))?;
        }
        let mut partial = path.clone().into_os_string();
        partial.push(".partial");
        std::fs::write(&partial, &data).map_err(|e| Self::io_error(key.as_str(), e))?;
        std::fs::rename(&partial, &path).map_err(|e| Self::io_error(key.as_str(), e))?;
        debug!(path = %path.display(), len = data.len(), "wrote key");
        Ok(())
    }

    fn delete(&self, key: &Key) -> StoreResult<bool> {
        match std::fs::remove_file(self.path_for(key.as_str())) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(key.as_str(), e)),
        }
    }

    fn list_subkeys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let dir = self.path_for(prefix);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(prefix, e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::io_error(prefix, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".partial") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
