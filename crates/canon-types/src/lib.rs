//! Foundation types for the canonical e-print record.
//!
//! Every other `canon-*` crate depends on these value types. They carry no
//! behavior beyond parsing, ordering, and (de)serialization.
//!
//! # Key Types
//!
//! - [`Identifier`]: an e-print identifier, new-style (`1901.00123`) or old-style (`hep-th/9901001`)
//! - [`VersionedIdentifier`]: one version of an e-print (`1901.00123v2`)
//! - [`YearMonth`]: a month partition of the record
//! - [`ListingIdentifier`]: one shard of a day's announcement listing
//! - [`Event`] / [`EventType`]: a change to the record
//! - [`Version`] / [`EPrint`] / [`Listing`]: the domain objects stored in the record
//! - [`CanonicalFile`] / [`Key`] / [`Uri`]: descriptors for stored and external bitstreams

pub mod eprint;
pub mod error;
pub mod event;
pub mod file;
pub mod identifier;
pub mod listing;
pub mod version;

pub use eprint::EPrint;
pub use error::TypeError;
pub use event::{Event, EventIdentifier, EventSummary, EventType};
pub use file::{CanonicalFile, ContentType, Key, Uri};
pub use identifier::{Identifier, VersionedIdentifier, YearMonth};
pub use listing::{Listing, ListingIdentifier, DEFAULT_SHARD};
pub use version::{License, Metadata, Person, Version, VersionReference};
