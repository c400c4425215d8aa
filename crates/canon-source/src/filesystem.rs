use std::path::{Component, Path, PathBuf};

use canon_types::Uri;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::readable::MemoizedReadable;
use crate::traits::ContentSource;

/// Resolves `file://` references that lie under a base directory.
///
/// References that climb out of the base with `..` are rejected.
#[derive(Clone, Debug)]
pub struct FilesystemSource {
    base_path: PathBuf,
}

impl FilesystemSource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve_path(&self, uri: &Uri) -> Option<PathBuf> {
        if !uri.is_file() {
            return None;
        }
        let path = Path::new(uri.path());
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return None;
        }
        path.starts_with(&self.base_path).then(|| path.to_path_buf())
    }
}

impl ContentSource for FilesystemSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn can_resolve(&self, uri: &Uri) -> bool {
        self.resolve_path(uri).is_some()
    }

    fn load_deferred(&self, uri: &Uri) -> SourceResult<MemoizedReadable> {
        let path = self
            .resolve_path(uri)
            .ok_or_else(|| SourceError::Unresolvable(uri.to_string()))?;
        let uri = uri.to_string();
        Ok(MemoizedReadable::deferred(move || {
            debug!(path = %path.display(), "reading file content");
            std::fs::read(&path).map_err(|source| SourceError::Io {
                uri: uri.clone(),
                source,
            })
        }))
    }
}
