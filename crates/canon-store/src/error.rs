use canon_integrity::IntegrityError;
use canon_record::RecordError;

/// Errors from storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing is stored under the key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// I/O error from the underlying backend.
    #[error("I/O error at {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored manifest could not be encoded or decoded.
    #[error("serialization error at {key}: {reason}")]
    Serialization { key: String, reason: String },

    /// Content to be written did not match its recorded checksum, or a
    /// manifest was incomplete.
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Content to be written could not be read.
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// A thread panicked while holding a storage lock.
    #[error("storage lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
