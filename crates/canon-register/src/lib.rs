//! Event-sourced register over the canonical e-print record.
//!
//! The register is the only mutable layer. Events flow in at the root and
//! are routed down two trees: e-prints (year, month, first-announcement day,
//! e-print, version) and listings (year, month, day, shard). Each node keeps
//! its record and integrity state, persists whatever it changes, and hands
//! its parent a fresh manifest entry.
//!
//! # Key Types
//!
//! - [`RegisterApi`]: transactional entry point for adding events and
//!   loading versions, e-prints, listings, and history
//! - [`RegisterRoot`]: the top of the tree
//! - [`RegisterNode`]: create, load, add events, and verify, at every level
//! - [`RegisterCollection`]: the generic collection node
//! - [`RegisterVersion`] / [`RegisterListing`]: the leaves of the two trees
//!
//! # Design Rules
//!
//! 1. Creating a version that exists, or changing one that does not, is a
//!    consistency error.
//! 2. A rejected batch of events leaves no trace in storage.
//! 3. Every manifest written reflects the checksums of what was written
//!    beneath it in the same batch.

pub mod api;
pub mod error;
pub mod levels;
pub mod listing;
pub mod node;
pub mod root;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{EventSelector, HistoryTarget, RegisterApi};
pub use error::{RegisterError, RegisterResult};
pub use levels::{
    RegisterEPrint, RegisterEPrintDay, RegisterEPrintMonth, RegisterEPrintYear, RegisterEPrints,
    RegisterListingDay, RegisterListingMonth, RegisterListingYear, RegisterListings,
};
pub use listing::RegisterListing;
pub use node::{Context, RegisterCollection, RegisterLevel, RegisterNode};
pub use root::RegisterRoot;
pub use version::RegisterVersion;
