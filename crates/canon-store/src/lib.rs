//! Storage for the canonical record.
//!
//! The record is a flat key space: entries hold raw bytes and manifests hold
//! pretty-printed JSON. Backends implement four byte-level operations and
//! inherit entry and manifest handling from [`CanonicalStorage`].
//!
//! # Storage Backends
//!
//! - [`InMemoryStorage`]: `HashMap`-based storage for tests and embedding
//! - [`FilesystemStorage`]: one file per key under a root directory
//! - [`StagedStorage`]: buffers changes over another backend until commit
//!
//! [`CanonicalSource`] exposes stored entries as a content source, so file
//! references of the form `arxiv:///{key}` resolve against the record.
//!
//! # Design Rules
//!
//! 1. Entry bytes are checked against their checksum before they are written.
//! 2. A manifest with an unresolved entry is never written.
//! 3. Absent keys are [`StoreError::NotFound`], distinct from I/O failures.
//! 4. Staged changes reach the base only on commit, all together.

pub mod canonical;
pub mod error;
pub mod filesystem;
pub mod memory;
pub mod staged;
pub mod traits;

pub use canonical::CanonicalSource;
pub use error::{StoreError, StoreResult};
pub use filesystem::FilesystemStorage;
pub use memory::InMemoryStorage;
pub use staged::StagedStorage;
pub use traits::{infer_content_type, CanonicalStorage};
