use std::sync::Arc;

use canon_source::{ContentSource, MemoizedReadable, SourceError, SourceResult};
use canon_types::{Key, Uri};

use crate::traits::CanonicalStorage;

/// Resolves `arxiv:///{key}` references against the record itself.
#[derive(Clone)]
pub struct CanonicalSource {
    storage: Arc<dyn CanonicalStorage>,
}

impl CanonicalSource {
    pub fn new(storage: Arc<dyn CanonicalStorage>) -> Self {
        Self { storage }
    }
}

impl ContentSource for CanonicalSource {
    fn name(&self) -> &str {
        "canonical"
    }

    fn can_resolve(&self, uri: &Uri) -> bool {
        uri.is_canonical()
    }

    fn load_deferred(&self, uri: &Uri) -> SourceResult<MemoizedReadable> {
        let key = Key::from_uri(uri).ok_or_else(|| SourceError::Unresolvable(uri.to_string()))?;
        let storage = self.storage.clone();
        let uri = uri.to_string();
        Ok(MemoizedReadable::deferred(move || {
            storage
                .read(&key)
                .map(|data| data.to_vec())
                .map_err(|e| SourceError::Backend {
                    uri: uri.clone(),
                    reason: e.to_string(),
                })
        }))
    }
}

impl std::fmt::Debug for CanonicalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalSource").finish_non_exhaustive()
    }
}
