use canon_source::SourceError;
use canon_types::TypeError;

/// Errors from encoding, decoding, or addressing records.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Content for an entry could not be resolved or read.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// A stored name or identifier failed to parse.
    #[error("invalid value: {0}")]
    Type(#[from] TypeError),

    #[error("cannot encode {key}: {reason}")]
    Encode { key: String, reason: String },

    #[error("cannot decode {key}: {reason}")]
    Decode { key: String, reason: String },

    /// A manifest names a member that does not belong at this level.
    #[error("unrecognized member {name:?} in {level} {parent}")]
    UnknownMember {
        level: &'static str,
        parent: String,
        name: String,
    },
}

/// Result alias for record operations.
pub type RecordResult<T> = Result<T, RecordError>;
