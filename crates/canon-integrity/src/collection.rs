use std::fmt;

use canon_crypto::Checksum;
use canon_record::Level;
use canon_types::Key;
use tracing::debug;

use crate::error::IntegrityResult;
use crate::manifest::{Manifest, ManifestEntry};

/// Integrity state of a collection above the version level.
///
/// The checksum is always the one derived from the manifest; it is
/// recomputed after every change to the manifest.
pub struct IntegrityCollection<L: Level> {
    pub name: L::Name,
    manifest: Manifest,
    checksum: Checksum,
}

impl<L: Level> IntegrityCollection<L> {
    /// An empty collection, as created by its first event.
    pub fn new(name: L::Name) -> IntegrityResult<Self> {
        Self::from_manifest(name, Manifest::default())
    }

    /// Adopt a manifest, typically one read from storage.
    pub fn from_manifest(name: L::Name, manifest: Manifest) -> IntegrityResult<Self> {
        let checksum = manifest.checksum()?;
        Ok(Self {
            name,
            manifest,
            checksum,
        })
    }

    pub fn manifest_key(&self) -> Key {
        L::manifest_key(&self.name)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    /// Stored checksum of a member, by its manifest name.
    pub fn member_checksum(&self, member: &L::MemberName) -> Option<&Checksum> {
        self.manifest
            .entry(&L::manifest_name(member))
            .and_then(|entry| entry.checksum.as_ref())
    }

    pub fn extend_manifest(&mut self, entry: ManifestEntry) -> IntegrityResult<()> {
        self.manifest.extend(entry)?;
        self.refresh()
    }

    pub fn update_or_extend_manifest(&mut self, entry: ManifestEntry) -> IntegrityResult<()> {
        self.manifest.update_or_extend(entry);
        self.refresh()
    }

    pub fn remove_from_manifest(&mut self, key: &str) -> IntegrityResult<Option<ManifestEntry>> {
        let removed = self.manifest.remove(key);
        self.refresh()?;
        Ok(removed)
    }

    /// This collection as listed in its parent's manifest.
    pub fn manifest_entry(&self, name_in_parent: impl Into<String>) -> ManifestEntry {
        ManifestEntry::collection(name_in_parent, self.checksum.clone(), &self.manifest)
    }

    /// The manifest's aggregate counters agree with its entries and the
    /// checksum is the one the manifest yields.
    ///
    /// This checks the collection as held in memory. Whether storage still
    /// matches it is decided by walking the stored tree, as
    /// `RegisterRoot::verify` in the register crate does.
    pub fn is_valid(&self) -> IntegrityResult<bool> {
        Ok(self.manifest.checksum()? == self.checksum && self.manifest.is_consistent())
    }

    fn refresh(&mut self) -> IntegrityResult<()> {
        self.checksum = self.manifest.checksum()?;
        debug!(
            level = L::LABEL,
            name = ?self.name,
            checksum = %self.checksum,
            entries = self.manifest.len(),
            "collection manifest updated"
        );
        Ok(())
    }
}

impl<L: Level> Clone for IntegrityCollection<L> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            manifest: self.manifest.clone(),
            checksum: self.checksum.clone(),
        }
    }
}

impl<L: Level> fmt::Debug for IntegrityCollection<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrityCollection")
            .field("level", &L::LABEL)
            .field("name", &self.name)
            .field("checksum", &self.checksum)
            .field("entries", &self.manifest.len())
            .finish()
    }
}
