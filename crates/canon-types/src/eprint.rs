use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::EventSummary;
use crate::identifier::{Identifier, VersionedIdentifier};
use crate::version::Version;

/// An e-print and all of its known versions, ordered by version number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EPrint {
    pub identifier: Identifier,
    #[serde(default)]
    pub versions: BTreeMap<VersionedIdentifier, Version>,
}

impl EPrint {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            versions: BTreeMap::new(),
        }
    }

    pub fn number_of_versions(&self) -> usize {
        self.versions.len()
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.values().next_back()
    }

    pub fn is_withdrawn(&self) -> bool {
        self.latest().map(|v| v.is_withdrawn).unwrap_or(false)
    }

    /// Event summaries across all versions, oldest version first.
    pub fn history(&self) -> impl Iterator<Item = &EventSummary> {
        self.versions.values().flat_map(|v| v.events.iter())
    }
}
