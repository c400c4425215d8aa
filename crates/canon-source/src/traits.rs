use std::sync::Arc;

use canon_types::Uri;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::readable::MemoizedReadable;

/// Resolver for one class of content references.
///
/// Implementations must satisfy these invariants:
/// - `can_resolve` is a pure check on the reference and performs no I/O.
/// - `load_deferred` performs no I/O either; bytes are fetched when the
///   returned readable is first read.
/// - `load_deferred` fails with [`SourceError::Unresolvable`] for any
///   reference that `can_resolve` rejects.
pub trait ContentSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether this source claims the reference.
    fn can_resolve(&self, uri: &Uri) -> bool;

    /// A lazy, re-readable handle on the referenced content.
    fn load_deferred(&self, uri: &Uri) -> SourceResult<MemoizedReadable>;
}

/// Ordered list of sources consulted during dereferencing.
pub type SourceList = [Arc<dyn ContentSource>];

/// Resolve a reference with the first source that claims it.
///
/// Later sources are never consulted once one claims the reference.
pub fn dereference(sources: &SourceList, uri: &Uri) -> SourceResult<MemoizedReadable> {
    for source in sources {
        if source.can_resolve(uri) {
            debug!(uri = %uri, source = source.name(), "dereferencing content");
            return source.load_deferred(uri);
        }
    }
    Err(SourceError::Unresolvable(uri.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Prefixed {
        prefix: &'static str,
        body: &'static [u8],
        loads: AtomicUsize,
    }

    impl ContentSource for Prefixed {
        fn name(&self) -> &str {
            self.prefix
        }

        fn can_resolve(&self, uri: &Uri) -> bool {
            uri.to_string().starts_with(self.prefix)
        }

        fn load_deferred(&self, _uri: &Uri) -> SourceResult<MemoizedReadable> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(MemoizedReadable::from_bytes(self.body))
        }
    }

    fn source(prefix: &'static str, body: &'static [u8]) -> Arc<Prefixed> {
        Arc::new(Prefixed {
            prefix,
            body,
            loads: AtomicUsize::new(0),
        })
    }

    #[test]
    fn first_claiming_source_wins() {
        let first = source("https://", b"first");
        let second = source("https://", b"second");
        let sources: Vec<Arc<dyn ContentSource>> = vec![first.clone(), second.clone()];
        let uri = Uri::parse("https://example.org/a").unwrap();
        let content = dereference(&sources, &uri).unwrap();
        assert_eq!(&content.bytes().unwrap()[..], b"first");
        assert_eq!(first.loads.load(Ordering::SeqCst), 1);
        assert_eq!(second.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unclaimed_reference_is_unresolvable() {
        let sources: Vec<Arc<dyn ContentSource>> = vec![source("file://", b"x")];
        let uri = Uri::parse("https://example.org/a").unwrap();
        assert!(matches!(
            dereference(&sources, &uri),
            Err(SourceError::Unresolvable(_))
        ));
    }

    #[test]
    fn empty_source_list_is_unresolvable() {
        let uri = Uri::parse("/tmp/a").unwrap();
        assert!(dereference(&[], &uri).is_err());
    }
}
