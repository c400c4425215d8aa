use std::collections::BTreeMap;

use canon_crypto::{checksum_collection, Checksum};
use canon_types::{EventType, Listing};
use serde::{Deserialize, Serialize};

use crate::error::{IntegrityError, IntegrityResult};

/// A parent's snapshot of one child's integrity state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub key: String,
    #[serde(default)]
    pub checksum: Option<Checksum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub number_of_events: u64,
    #[serde(default)]
    pub number_of_events_by_type: BTreeMap<EventType, u64>,
    #[serde(default)]
    pub number_of_versions: u64,
}

impl ManifestEntry {
    /// Entry for a stored bitstream.
    pub fn file(key: impl Into<String>, checksum: Checksum, size_bytes: u64, mime_type: &str) -> Self {
        Self {
            key: key.into(),
            checksum: Some(checksum),
            size_bytes: Some(size_bytes),
            mime_type: Some(mime_type.to_string()),
            ..Self::default()
        }
    }

    /// Entry for a version within its e-print; always counts one version.
    pub fn version(key: impl Into<String>, checksum: Checksum) -> Self {
        Self {
            key: key.into(),
            checksum: Some(checksum),
            number_of_versions: 1,
            ..Self::default()
        }
    }

    /// Entry for a listing file, carrying the listing's event counts.
    pub fn listing(key: impl Into<String>, checksum: Checksum, size_bytes: u64, mime_type: &str, listing: &Listing) -> Self {
        Self {
            number_of_events: listing.number_of_events(),
            number_of_events_by_type: listing.number_of_events_by_type(),
            ..Self::file(key, checksum, size_bytes, mime_type)
        }
    }

    /// Entry for a child collection, carrying the child's aggregates.
    pub fn collection(key: impl Into<String>, checksum: Checksum, manifest: &Manifest) -> Self {
        Self {
            key: key.into(),
            checksum: Some(checksum),
            number_of_events: manifest.number_of_events,
            number_of_events_by_type: manifest.number_of_events_by_type.clone(),
            number_of_versions: manifest.number_of_versions,
            ..Self::default()
        }
    }

    pub fn require_checksum(&self) -> IntegrityResult<&Checksum> {
        self.checksum
            .as_ref()
            .ok_or_else(|| IntegrityError::MissingChecksum { key: self.key.clone() })
    }
}

/// Ordered, checksum-bearing description of a collection's direct children.
///
/// Entries are kept sorted by key and unique. Unless pinned as a version
/// manifest, the aggregate counters are the sums of the entries' counters.
/// Stored aggregates are kept as read so that [`Manifest::is_consistent`]
/// can check them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredManifest")]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    number_of_events: u64,
    number_of_events_by_type: BTreeMap<EventType, u64>,
    number_of_versions: u64,
}

#[derive(Deserialize)]
struct StoredManifest {
    entries: Vec<ManifestEntry>,
    #[serde(default)]
    number_of_events: u64,
    #[serde(default)]
    number_of_events_by_type: BTreeMap<EventType, u64>,
    #[serde(default)]
    number_of_versions: u64,
}

impl From<StoredManifest> for Manifest {
    fn from(stored: StoredManifest) -> Self {
        let mut entries = stored.entries;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            entries,
            number_of_events: stored.number_of_events,
            number_of_events_by_type: stored.number_of_events_by_type,
            number_of_versions: stored.number_of_versions,
        }
    }
}

impl Manifest {
    /// Build a manifest from scratch. A later entry with a repeated key
    /// replaces the earlier one.
    pub fn make(entries: impl IntoIterator<Item = ManifestEntry>) -> Self {
        let by_key: BTreeMap<String, ManifestEntry> =
            entries.into_iter().map(|entry| (entry.key.clone(), entry)).collect();
        let mut manifest = Self {
            entries: by_key.into_values().collect(),
            ..Self::default()
        };
        manifest.recount();
        manifest
    }

    /// Manifest of a single version: one version, no events.
    pub fn for_version(entries: impl IntoIterator<Item = ManifestEntry>) -> Self {
        let mut manifest = Self::make(entries);
        manifest.pin_single_version();
        manifest
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Option<&ManifestEntry> {
        self.position(key).ok().map(|idx| &self.entries[idx])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn number_of_events(&self) -> u64 {
        self.number_of_events
    }

    pub fn number_of_events_by_type(&self) -> &BTreeMap<EventType, u64> {
        &self.number_of_events_by_type
    }

    pub fn number_of_versions(&self) -> u64 {
        self.number_of_versions
    }

    /// Add an entry for a member not yet listed.
    pub fn extend(&mut self, entry: ManifestEntry) -> IntegrityResult<()> {
        match self.position(&entry.key) {
            Ok(_) => Err(IntegrityError::DuplicateEntry { key: entry.key }),
            Err(idx) => {
                self.entries.insert(idx, entry);
                self.recount();
                Ok(())
            }
        }
    }

    /// Replace the entry with the same key, or add it if absent.
    ///
    /// The entry's checksum and counters are both replaced, so aggregates
    /// track children whose event counts grow.
    pub fn update_or_extend(&mut self, entry: ManifestEntry) {
        match self.position(&entry.key) {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
        self.recount();
    }

    pub fn remove(&mut self, key: &str) -> Option<ManifestEntry> {
        let idx = self.position(key).ok()?;
        let removed = self.entries.remove(idx);
        self.recount();
        Some(removed)
    }

    /// Force version-manifest totals after a mutation.
    pub fn pin_single_version(&mut self) {
        self.number_of_events = 0;
        self.number_of_events_by_type.clear();
        self.number_of_versions = 1;
    }

    /// Checksum of the collection this manifest describes.
    pub fn checksum(&self) -> IntegrityResult<Checksum> {
        let mut members = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            members.push((entry.key.as_str(), entry.require_checksum()?));
        }
        Ok(checksum_collection(members))
    }

    /// Every entry has a checksum.
    pub fn ensure_complete(&self) -> IntegrityResult<()> {
        self.entries.iter().try_for_each(|entry| entry.require_checksum().map(|_| ()))
    }

    /// The stored aggregates equal the sums over entries.
    pub fn is_consistent(&self) -> bool {
        let mut summed = self.clone();
        summed.recount();
        summed == *self
    }

    fn position(&self, key: &str) -> Result<usize, usize> {
        self.entries.binary_search_by(|entry| entry.key.as_str().cmp(key))
    }

    fn recount(&mut self) {
        let mut by_type: BTreeMap<EventType, u64> = BTreeMap::new();
        for entry in &self.entries {
            for (event_type, count) in &entry.number_of_events_by_type {
                *by_type.entry(*event_type).or_default() += count;
            }
        }
        self.number_of_events = self.entries.iter().map(|e| e.number_of_events).sum();
        self.number_of_versions = self.entries.iter().map(|e| e.number_of_versions).sum();
        self.number_of_events_by_type = by_type;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(key: &str, events: u64, event_type: EventType, versions: u64) -> ManifestEntry {
        let mut by_type = BTreeMap::new();
        if events > 0 {
            by_type.insert(event_type, events);
        }
        ManifestEntry {
            key: key.to_string(),
            checksum: Some(Checksum::of_bytes(key.as_bytes())),
            number_of_events: events,
            number_of_events_by_type: by_type,
            number_of_versions: versions,
            ..ManifestEntry::default()
        }
    }

    #[test]
    fn aggregates_sum_over_entries() {
        let manifest = Manifest::make([
            entry("2019-01-02", 3, EventType::New, 3),
            entry("2019-01-03", 2, EventType::Replaced, 2),
            entry("2019-01-04", 1, EventType::New, 1),
        ]);
        assert_eq!(manifest.number_of_events(), 6);
        assert_eq!(manifest.number_of_versions(), 6);
        assert_eq!(manifest.number_of_events_by_type()[&EventType::New], 4);
        assert_eq!(manifest.number_of_events_by_type()[&EventType::Replaced], 2);
        assert!(manifest.is_consistent());
    }

    #[test]
    fn extend_rejects_duplicates() {
        let mut manifest = Manifest::make([entry("a", 1, EventType::New, 1)]);
        let err = manifest.extend(entry("a", 1, EventType::New, 1)).unwrap_err();
        assert!(matches!(err, IntegrityError::DuplicateEntry { .. }));
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn update_replaces_counters_too() {
        let mut manifest = Manifest::make([entry("a", 1, EventType::New, 1), entry("b", 1, EventType::New, 1)]);
        manifest.update_or_extend(entry("a", 2, EventType::Updated, 1));
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.number_of_events(), 3);
        assert_eq!(manifest.number_of_events_by_type()[&EventType::Updated], 2);
        assert_eq!(manifest.number_of_events_by_type()[&EventType::New], 1);
    }

    #[test]
    fn version_manifest_counts_one_version() {
        let checksum = Checksum::of_bytes(b"x");
        let mut manifest = Manifest::for_version([
            ManifestEntry::file("v1/a.json", checksum.clone(), 10, "application/json"),
            ManifestEntry::file("v1/a.pdf", checksum.clone(), 20, "application/pdf"),
        ]);
        assert_eq!(manifest.number_of_versions(), 1);
        assert_eq!(manifest.number_of_events(), 0);
        manifest.remove("v1/a.pdf");
        manifest.pin_single_version();
        assert_eq!(manifest.number_of_versions(), 1);
    }

    #[test]
    fn missing_checksum_is_an_error() {
        let mut incomplete = entry("a", 0, EventType::New, 0);
        incomplete.checksum = None;
        let manifest = Manifest::make([incomplete]);
        assert!(matches!(
            manifest.checksum(),
            Err(IntegrityError::MissingChecksum { ref key }) if key == "a"
        ));
        assert!(manifest.ensure_complete().is_err());
    }

    #[test]
    fn checksum_is_digest_of_sorted_entry_checksums() {
        let a = entry("a", 0, EventType::New, 0);
        let b = entry("b", 0, EventType::New, 0);
        let concatenated = format!("{}{}", a.checksum.clone().unwrap(), b.checksum.clone().unwrap());
        let manifest = Manifest::make([b, a]);
        assert_eq!(manifest.checksum().unwrap(), Checksum::of_bytes(concatenated.as_bytes()));
    }

    #[test]
    fn wire_format() {
        let manifest = Manifest::make([entry("2029-01-29", 2, EventType::MigrateMetadata, 1)]);
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["number_of_events"], 2);
        assert_eq!(value["number_of_versions"], 1);
        assert_eq!(value["number_of_events_by_type"]["migrate_metadata"], 2);
        assert_eq!(value["entries"][0]["key"], "2029-01-29");
        assert!(value["entries"][0].get("size_bytes").is_none());

        let back: Manifest = serde_json::from_value(value).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn minimal_entries_deserialize() {
        let json = r#"{"entries":[{"key":"a","checksum":"1B2M2Y8AsgTpgAmY7PhCfg=="}],
                       "number_of_events":0,"number_of_events_by_type":{},"number_of_versions":0}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.entry("a").unwrap().number_of_versions, 0);
        assert!(manifest.is_consistent());
    }

    #[derive(Clone, Debug)]
    enum Op {
        Extend(ManifestEntry),
        Update(ManifestEntry),
        Remove(String),
    }

    fn arb_entry() -> impl Strategy<Value = ManifestEntry> {
        (0usize..6, 0u64..5, 0usize..EventType::ALL.len(), 0u64..3)
            .prop_map(|(k, events, t, versions)| entry(&format!("k{k}"), events, EventType::ALL[t], versions))
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            arb_entry().prop_map(Op::Extend),
            arb_entry().prop_map(Op::Update),
            (0usize..6).prop_map(|k| Op::Remove(format!("k{k}"))),
        ]
    }

    proptest! {
        #[test]
        fn aggregates_hold_after_any_mutation_sequence(ops in proptest::collection::vec(arb_op(), 0..40)) {
            let mut manifest = Manifest::default();
            for op in ops {
                match op {
                    Op::Extend(e) => { let _ = manifest.extend(e); }
                    Op::Update(e) => manifest.update_or_extend(e),
                    Op::Remove(k) => { manifest.remove(&k); }
                }
                let events: u64 = manifest.entries().iter().map(|e| e.number_of_events).sum();
                let versions: u64 = manifest.entries().iter().map(|e| e.number_of_versions).sum();
                let by_type: u64 = manifest.number_of_events_by_type().values().sum();
                prop_assert_eq!(manifest.number_of_events(), events);
                prop_assert_eq!(manifest.number_of_versions(), versions);
                prop_assert_eq!(by_type, events);
                prop_assert!(manifest.is_consistent());
            }
            let keys: Vec<&str> = manifest.entries().iter().map(|e| e.key.as_str()).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(keys, sorted);
        }

        #[test]
        fn checksum_ignores_insertion_order(entries in proptest::collection::btree_map(0usize..20, arb_entry(), 1..10)) {
            let unique: Vec<ManifestEntry> = entries
                .into_iter()
                .map(|(k, mut e)| { e.key = format!("m{k}"); e })
                .collect();
            let forward = Manifest::make(unique.clone());
            let mut incremental = Manifest::default();
            for e in unique.iter().rev() {
                incremental.extend(e.clone()).unwrap();
            }
            prop_assert_eq!(forward.checksum().unwrap(), incremental.checksum().unwrap());
            prop_assert_eq!(forward, incremental);
        }
    }
}
