use std::fmt;
use std::io::Cursor;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;

use crate::error::SourceResult;

type Loader = Box<dyn Fn() -> SourceResult<Vec<u8>> + Send + Sync>;

enum Content {
    Ready(Bytes),
    Deferred { loader: Loader, cache: OnceLock<Bytes> },
}

/// A byte resource that is loaded at most once and can be re-read from the start.
///
/// Deferred content is fetched on the first call to [`bytes`](Self::bytes) or
/// [`reader`](Self::reader) and cached for the lifetime of the resource. A
/// failed load is not cached, so a later read tries again. Clones share the
/// same cache.
#[derive(Clone)]
pub struct MemoizedReadable {
    content: Arc<Content>,
}

impl MemoizedReadable {
    /// Wrap bytes that are already in memory.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            content: Arc::new(Content::Ready(data.into())),
        }
    }

    /// Defer loading until the content is first read.
    pub fn deferred<F>(loader: F) -> Self
    where
        F: Fn() -> SourceResult<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            content: Arc::new(Content::Deferred {
                loader: Box::new(loader),
                cache: OnceLock::new(),
            }),
        }
    }

    /// The full content, loading it if necessary.
    pub fn bytes(&self) -> SourceResult<Bytes> {
        match self.content.as_ref() {
            Content::Ready(data) => Ok(data.clone()),
            Content::Deferred { loader, cache } => {
                if let Some(data) = cache.get() {
                    return Ok(data.clone());
                }
                let loaded = Bytes::from(loader()?);
                Ok(cache.get_or_init(|| loaded).clone())
            }
        }
    }

    /// A fresh reader positioned at offset zero.
    pub fn reader(&self) -> SourceResult<Cursor<Bytes>> {
        Ok(Cursor::new(self.bytes()?))
    }

    /// Returns `true` once the content is held in memory.
    pub fn is_loaded(&self) -> bool {
        match self.content.as_ref() {
            Content::Ready(_) => true,
            Content::Deferred { cache, .. } => cache.get().is_some(),
        }
    }
}

impl fmt::Debug for MemoizedReadable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedReadable")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
