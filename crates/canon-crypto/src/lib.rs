//! Checksum primitives for the canonical record.
//!
//! Every checksum in the record is an MD5 digest encoded as URL-safe base64
//! (padding kept). Leaves hash their raw bytes; collections hash the
//! concatenation of their members' checksums, sorted by member key. This is
//! the same composition S3 uses for multipart ETags, so a stored subtree can
//! be compared against a replica without re-reading every leaf.
//!
//! All digests wrap established libraries (`md-5`, `base64`); no custom
//! cryptography.

pub mod checksum;
pub mod error;

pub use checksum::{checksum_collection, checksum_reader, Checksum, StreamHasher};
pub use error::{ChecksumError, ChecksumResult};
