/// Errors from resolving or reading external content.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// No configured source claims the reference.
    #[error("no source can resolve {0}")]
    Unresolvable(String),

    /// Reading a local file failed.
    #[error("I/O error reading {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote answered with a non-retryable status.
    #[error("could not retrieve {uri}: HTTP {status}")]
    Http { uri: String, status: u16 },

    /// Every attempt failed with a transient error.
    #[error("could not retrieve {uri} after {attempts} attempts: {last}")]
    RetriesExhausted {
        uri: String,
        attempts: u32,
        last: String,
    },

    /// A backing store failed while loading content.
    #[error("backend error loading {uri}: {reason}")]
    Backend { uri: String, reason: String },
}

/// Result alias for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
