use canon_crypto::ChecksumError;
use canon_record::RecordError;

/// Errors from computing or checking integrity information.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    /// A manifest entry has no checksum, so its collection cannot be
    /// summarized or persisted.
    #[error("manifest entry {key} has no checksum")]
    MissingChecksum { key: String },

    /// Stored and recomputed checksums disagree.
    #[error("checksum mismatch for {key}: expected {expected}, found {actual}")]
    Validation {
        key: String,
        expected: String,
        actual: String,
    },

    /// `extend` was asked to add an entry that is already present.
    #[error("manifest already has an entry for {key}")]
    DuplicateEntry { key: String },

    #[error("checksum error: {0}")]
    Checksum(#[from] ChecksumError),

    #[error("record error: {0}")]
    Record(#[from] RecordError),
}

/// Result alias for integrity operations.
pub type IntegrityResult<T> = Result<T, IntegrityError>;
