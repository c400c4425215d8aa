//! Content source resolution for the canonical record.
//!
//! Files named by a version (source packages, renders) are often references
//! to content that lives elsewhere: a local path, a trusted HTTP mirror, or
//! another key in the record. A [`ContentSource`] claims a class of
//! references and turns one into a [`MemoizedReadable`], a lazily-loaded
//! byte resource that can be re-read from the start any number of times.
//!
//! # Key Types
//!
//! - [`ContentSource`]: the resolver interface
//! - [`dereference`]: ordered resolution across a list of sources
//! - [`MemoizedReadable`]: deferred, cached, re-readable content
//! - [`FilesystemSource`]: `file://` references under a base directory
//! - [`RemoteSource`]: `http(s)://` references on one trusted domain
//!
//! # Design Rules
//!
//! 1. Sources are tried strictly in order; the first that claims a reference wins.
//! 2. No bytes are read until a caller asks for them.
//! 3. Once read, content is cached for the lifetime of the readable.
//! 4. Retries and backoff are internal to a source; exhausted retries are errors.

pub mod error;
pub mod filesystem;
pub mod readable;
pub mod remote;
pub mod traits;

pub use error::{SourceError, SourceResult};
pub use filesystem::FilesystemSource;
pub use readable::MemoizedReadable;
pub use remote::{HttpFetcher, HttpResponse, RemoteSource, RetryPolicy, UreqFetcher};
pub use traits::{dereference, ContentSource, SourceList};
