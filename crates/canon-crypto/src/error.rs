/// Errors from checksum computation or parsing.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// The value is not URL-safe base64 of a 16-byte digest.
    #[error("malformed checksum: {0}")]
    Malformed(String),

    /// The stream being hashed could not be read or repositioned.
    #[error("I/O error while hashing: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for checksum operations.
pub type ChecksumResult<T> = Result<T, ChecksumError>;
