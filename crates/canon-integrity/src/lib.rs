//! Integrity layer for the canonical record.
//!
//! Every record node has one integrity node holding its checksum. Leaves
//! hash their content; collections hash a manifest of their members'
//! checksums, sorted by key. The composition is Merkle-like: a collection's
//! checksum changes whenever any descendant's content changes.
//!
//! # Key Types
//!
//! - [`Manifest`], [`ManifestEntry`]: the stored description of a collection
//! - [`IntegrityEntry`], [`IntegrityListing`]: leaf checksums
//! - [`IntegrityVersion`]: member checksums and the version manifest
//! - [`IntegrityCollection`]: every level above the version
//!
//! # Design Rules
//!
//! 1. Checksums are URL-safe base64 MD5 digests, padding kept.
//! 2. A collection checksum depends only on its manifest entries' checksums.
//! 3. Aggregate counters equal the sums over entries after every change,
//!    except in a version manifest, which always counts one version.
//! 4. A manifest with an entry lacking a checksum cannot be summarized.

pub mod collection;
pub mod entry;
pub mod error;
pub mod manifest;
pub mod version;

pub use collection::IntegrityCollection;
pub use entry::{IntegrityEntry, IntegrityListing};
pub use error::{IntegrityError, IntegrityResult};
pub use manifest::{Manifest, ManifestEntry};
pub use version::IntegrityVersion;
