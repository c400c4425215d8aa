use thiserror::Error;

/// Errors produced when parsing or validating domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("not a valid e-print identifier: {0}")]
    InvalidIdentifier(String),

    #[error("not a valid versioned identifier: {0}")]
    InvalidVersionedIdentifier(String),

    #[error("not a valid listing identifier: {0}")]
    InvalidListingIdentifier(String),

    #[error("not a valid event identifier: {0}")]
    InvalidEventIdentifier(String),

    #[error("not a valid year-month: {0}")]
    InvalidYearMonth(String),

    #[error("not a valid URI: {0}")]
    InvalidUri(String),

    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}
