use std::collections::BTreeMap;

use canon_crypto::Checksum;
use canon_record::RecordVersion;
use canon_types::{Key, VersionedIdentifier};
use tracing::debug;

use crate::entry::IntegrityEntry;
use crate::error::IntegrityResult;
use crate::manifest::{Manifest, ManifestEntry};

/// Integrity state of one version: a checksum per member entry and the
/// version manifest summarizing them.
#[derive(Clone, Debug)]
pub struct IntegrityVersion {
    pub identifier: VersionedIdentifier,
    members: BTreeMap<Key, IntegrityEntry>,
    manifest: Manifest,
    checksum: Checksum,
}

impl IntegrityVersion {
    /// Hash every member of a freshly built version.
    pub fn from_record(record: &RecordVersion) -> IntegrityResult<Self> {
        let mut members = BTreeMap::new();
        for (key, member) in record.members() {
            let entry = IntegrityEntry::from_stream(key.clone(), member.stream.clone())?;
            members.insert(key, entry);
        }
        Self::from_members(record.identifier.clone(), members)
    }

    /// Rebuild from a stored manifest, trusting its member checksums.
    ///
    /// Members missing from the manifest are hashed; nothing else is read.
    pub fn from_manifest(record: &RecordVersion, manifest: &Manifest) -> IntegrityResult<Self> {
        let mut members = BTreeMap::new();
        for (key, member) in record.members() {
            let entry = match manifest.entry(key.as_str()).and_then(|e| e.checksum.clone()) {
                Some(checksum) => IntegrityEntry::with_checksum(key.clone(), member.stream.clone(), checksum),
                None => IntegrityEntry::from_stream(key.clone(), member.stream.clone())?,
            };
            members.insert(key, entry);
        }
        Self::from_members(record.identifier.clone(), members)
    }

    fn from_members(identifier: VersionedIdentifier, members: BTreeMap<Key, IntegrityEntry>) -> IntegrityResult<Self> {
        let manifest = Manifest::for_version(members.values().map(IntegrityEntry::manifest_entry));
        let checksum = manifest.checksum()?;
        Ok(Self {
            identifier,
            members,
            manifest,
            checksum,
        })
    }

    pub fn manifest_key(&self) -> Key {
        RecordVersion::make_manifest_key(&self.identifier)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn member(&self, key: &Key) -> Option<&IntegrityEntry> {
        self.members.get(key)
    }

    pub fn members(&self) -> impl Iterator<Item = &IntegrityEntry> {
        self.members.values()
    }

    /// Add or replace a member and refresh the manifest and checksum.
    pub fn put_member(&mut self, entry: IntegrityEntry) -> IntegrityResult<()> {
        debug!(version = %self.identifier, key = %entry.key, checksum = %entry.checksum(), "version member set");
        self.manifest.update_or_extend(entry.manifest_entry());
        self.members.insert(entry.key.clone(), entry);
        self.refresh()
    }

    pub fn remove_member(&mut self, key: &Key) -> IntegrityResult<Option<IntegrityEntry>> {
        self.manifest.remove(key.as_str());
        let removed = self.members.remove(key);
        self.refresh()?;
        Ok(removed)
    }

    /// This version as listed in its e-print's manifest.
    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry::version(self.identifier.to_string(), self.checksum.clone())
    }

    /// The checksum equals one recomputed from the manifest.
    pub fn is_valid(&self) -> IntegrityResult<bool> {
        Ok(self.manifest.checksum()? == self.checksum)
    }

    /// Member keys whose content no longer matches the recorded checksum.
    pub fn invalid_members(&self) -> IntegrityResult<Vec<Key>> {
        let mut invalid = Vec::new();
        for entry in self.members.values() {
            if !entry.is_valid()? {
                invalid.push(entry.key.clone());
            }
        }
        Ok(invalid)
    }

    fn refresh(&mut self) -> IntegrityResult<()> {
        self.manifest.pin_single_version();
        self.checksum = self.manifest.checksum()?;
        Ok(())
    }
}
