use std::io::Cursor;

use bytes::Bytes;
use canon_source::MemoizedReadable;
use canon_types::ContentType;

use crate::error::RecordResult;

/// Content of one entry, with its declared content type and size.
///
/// The content may already be in memory or may be deferred until first read;
/// either way every reader starts at offset zero.
#[derive(Clone, Debug)]
pub struct RecordStream {
    pub content: MemoizedReadable,
    pub content_type: ContentType,
    pub size_bytes: u64,
}

impl RecordStream {
    /// Stream over bytes already in memory; the size is their length.
    pub fn from_bytes(data: impl Into<Bytes>, content_type: ContentType) -> Self {
        let data: Bytes = data.into();
        Self {
            size_bytes: data.len() as u64,
            content: MemoizedReadable::from_bytes(data),
            content_type,
        }
    }

    /// Stream over deferred content with a declared size.
    pub fn deferred(content: MemoizedReadable, content_type: ContentType, size_bytes: u64) -> Self {
        Self {
            content,
            content_type,
            size_bytes,
        }
    }

    pub fn bytes(&self) -> RecordResult<Bytes> {
        Ok(self.content.bytes()?)
    }

    pub fn reader(&self) -> RecordResult<Cursor<Bytes>> {
        Ok(self.content.reader()?)
    }

    pub fn mime_type(&self) -> &'static str {
        self.content_type.mime_type()
    }
}
