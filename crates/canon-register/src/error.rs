use canon_integrity::IntegrityError;
use canon_record::RecordError;
use canon_source::SourceError;
use canon_store::StoreError;
use canon_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegisterError {
    /// The change would contradict what the record already holds.
    #[error("consistency error: {0}")]
    Consistency(String),

    #[error("no such resource: {0}")]
    NoSuchResource(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("record error: {0}")]
    Record(#[from] RecordError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("invalid value: {0}")]
    Type(#[from] TypeError),

    #[error("register lock poisoned")]
    LockPoisoned,
}

impl RegisterError {
    /// Map a missing key to [`RegisterError::NoSuchResource`] for `what`.
    pub(crate) fn missing(err: StoreError, what: impl std::fmt::Display) -> Self {
        if err.is_not_found() {
            Self::NoSuchResource(what.to_string())
        } else {
            Self::Store(err)
        }
    }
}

pub type RegisterResult<T> = Result<T, RegisterError>;
