//! Record layer for the canonical e-print record.
//!
//! Maps domain objects to keyed binary entries and to the hierarchy of
//! collections that contain them. This layer is purely structural: it knows
//! how to encode, decode, and address things, not how to verify or mutate
//! them, and it performs no I/O of its own beyond reading streams that
//! callers hand it.
//!
//! # Key Types
//!
//! - [`RecordStream`]: content bytes plus declared content type and size
//! - [`RecordEntry`]: a leaf: key, stream, and domain object
//!   ([`RecordMetadata`], [`RecordFile`], [`RecordListing`])
//! - [`RecordVersion`]: the entries that make up one e-print version
//! - [`Level`]: per-level key derivation, member naming, and event projection
//! - [`RecordCollection`]: a named set of members at one level
//!
//! # Design Rules
//!
//! 1. Keys are computed from identifiers and partitions, never chosen.
//! 2. Decoding an encoded metadata or listing entry yields an equal object.
//! 3. File entries pass bytes through uninterpreted.
//! 4. Member names are unique within a collection.

pub mod collection;
pub mod entry;
pub mod error;
pub mod level;
pub mod stream;
pub mod version;

pub use collection::RecordCollection;
pub use entry::{RecordEntry, RecordFile, RecordListing, RecordMetadata};
pub use error::{RecordError, RecordResult};
pub use level::{
    AllEPrintsLevel, AllListingsLevel, EPrintDayLevel, EPrintLevel, EPrintMonthLevel,
    EPrintYearLevel, Level, ListingDayLevel, ListingMonthLevel, ListingYearLevel, RootLevel,
    TopLevel,
};
pub use stream::RecordStream;
pub use version::{MemberRef, RecordVersion};
