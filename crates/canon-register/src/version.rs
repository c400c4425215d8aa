use std::collections::BTreeSet;

use canon_crypto::{checksum_collection, Checksum};
use canon_integrity::{IntegrityEntry, IntegrityVersion, ManifestEntry};
use canon_record::{RecordFile, RecordMetadata, RecordVersion};
use canon_types::{Event, EventSummary, EventType, Key, Version, VersionedIdentifier};
use tracing::{debug, info};

use crate::error::{RegisterError, RegisterResult};
use crate::node::{Context, RegisterNode};

/// What an event does to the version it names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    /// Bring a version into being; the version must not exist.
    Create,
    /// Change a version in place; the version must exist.
    Update,
}

fn action_for(event_type: EventType) -> Action {
    match event_type {
        EventType::New | EventType::Replaced | EventType::Withdrawn => Action::Create,
        EventType::Updated | EventType::Migrate | EventType::MigrateMetadata | EventType::Cross => {
            Action::Update
        }
    }
}

/// Keep every summary already recorded and append unseen ones in order.
fn merge_history(current: &[EventSummary], incoming: &[EventSummary]) -> Vec<EventSummary> {
    let mut merged = current.to_vec();
    for summary in incoming {
        if !merged.iter().any(|seen| seen.event_id == summary.event_id) {
            merged.push(summary.clone());
        }
    }
    merged
}

/// One version of an e-print: its record and the integrity of every member.
#[derive(Clone, Debug)]
pub struct RegisterVersion {
    record: RecordVersion,
    integrity: IntegrityVersion,
}

impl RegisterVersion {
    pub fn identifier(&self) -> &VersionedIdentifier {
        &self.record.identifier
    }

    pub fn record(&self) -> &RecordVersion {
        &self.record
    }

    pub fn integrity(&self) -> &IntegrityVersion {
        &self.integrity
    }

    pub fn to_domain(&self) -> Version {
        self.record.to_domain()
    }

    fn create_from(ctx: &Context<'_>, version: &Version) -> RegisterResult<Self> {
        let record = RecordVersion::from_domain(version, ctx.sources)?;
        let integrity = IntegrityVersion::from_record(&record)?;
        for entry in integrity.members() {
            ctx.storage.store_entry(entry)?;
        }
        ctx.storage.store_manifest(&integrity.manifest_key(), integrity.manifest())?;
        info!(version = %record.identifier, checksum = %integrity.checksum(), "version created");
        Ok(Self { record, integrity })
    }

    /// Bring the stored version in line with `version`.
    ///
    /// Members missing from `version` are deleted. A file whose descriptor
    /// already references this version's own key is left as stored. Anything
    /// else is rewritten only when its checksum changed.
    fn update(&mut self, ctx: &Context<'_>, version: &Version) -> RegisterResult<()> {
        let vid = self.identifier().clone();
        let mut merged = version.clone();
        merged.events = merge_history(&self.record.metadata.domain.events, &version.events);

        let mut retained = BTreeSet::new();
        for file in std::iter::once(&merged.source)
            .chain(merged.render.iter())
            .chain(merged.formats.values())
        {
            let key = RecordFile::make_key(&vid, file);
            if RecordFile::refers_to_itself(file, &key) && self.integrity.member(&key).is_some() {
                retained.insert(key);
            }
        }

        let candidate = RecordVersion::from_domain(&merged, ctx.sources)?;
        let members = candidate.members();

        let stale: Vec<Key> = self
            .integrity
            .members()
            .map(|entry| entry.key.clone())
            .filter(|key| !members.contains_key(key))
            .collect();
        for key in stale {
            ctx.storage.delete(&key)?;
            self.integrity.remove_member(&key)?;
            debug!(version = %vid, key = %key, "version member removed");
        }

        for (key, member) in &members {
            if retained.contains(key) {
                continue;
            }
            let entry = IntegrityEntry::from_stream(key.clone(), member.stream.clone())?;
            if self.integrity.member(key).map(IntegrityEntry::checksum) == Some(entry.checksum()) {
                continue;
            }
            ctx.storage.store_entry(&entry)?;
            self.integrity.put_member(entry)?;
        }

        ctx.storage
            .store_manifest(&self.integrity.manifest_key(), self.integrity.manifest())?;
        self.record = candidate;
        info!(version = %vid, checksum = %self.integrity.checksum(), "version updated");
        Ok(())
    }
}

impl RegisterNode for RegisterVersion {
    type Name = VersionedIdentifier;

    fn create(ctx: &Context<'_>, name: &VersionedIdentifier, events: &[Event]) -> RegisterResult<Self> {
        let (first, rest) = events
            .split_first()
            .ok_or_else(|| RegisterError::Consistency(format!("no event creates {name}")))?;
        if action_for(first.event_type) != Action::Create {
            return Err(RegisterError::Consistency(format!(
                "{name} does not exist; cannot apply {} event",
                first.event_type
            )));
        }
        let mut node = Self::create_from(ctx, &first.version)?;
        node.add_events(ctx, rest)?;
        Ok(node)
    }

    fn load(ctx: &Context<'_>, name: &VersionedIdentifier) -> RegisterResult<Self> {
        let key = RecordMetadata::make_key(name);
        let (stream, _) = ctx
            .storage
            .load_entry(&key)
            .map_err(|e| RegisterError::missing(e, format!("version {name}")))?;
        let metadata = RecordMetadata::from_stream(key, stream)?;
        let manifest = ctx
            .storage
            .load_manifest(&RecordVersion::make_manifest_key(name))
            .map_err(|e| RegisterError::missing(e, format!("manifest of {name}")))?;
        let record = RecordVersion::from_metadata(metadata, ctx.sources)?;
        let integrity = IntegrityVersion::from_manifest(&record, &manifest)?;
        Ok(Self { record, integrity })
    }

    fn add_events(&mut self, ctx: &Context<'_>, events: &[Event]) -> RegisterResult<()> {
        for event in events {
            match action_for(event.event_type) {
                Action::Create => {
                    return Err(RegisterError::Consistency(format!(
                        "{} already exists; cannot apply {} event",
                        self.identifier(),
                        event.event_type
                    )));
                }
                Action::Update => self.update(ctx, &event.version)?,
            }
        }
        Ok(())
    }

    fn checksum(&self) -> &Checksum {
        self.integrity.checksum()
    }

    fn manifest_entry(&self, name_in_parent: String) -> ManifestEntry {
        ManifestEntry::version(name_in_parent, self.integrity.checksum().clone())
    }

    fn stored_key(name: &VersionedIdentifier) -> Key {
        RecordVersion::make_manifest_key(name)
    }

    fn verify(ctx: &Context<'_>, name: &VersionedIdentifier, invalid: &mut Vec<Key>) -> RegisterResult<Option<Checksum>> {
        let key = RecordVersion::make_manifest_key(name);
        let manifest = match ctx.storage.load_manifest(&key) {
            Ok(manifest) => manifest,
            Err(e) if e.is_not_found() => {
                invalid.push(key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let pinned = manifest.number_of_versions() == 1 && manifest.number_of_events() == 0;
        if !pinned || !manifest.contains(RecordMetadata::make_key(name).as_str()) {
            invalid.push(key.clone());
        }

        let mut recomputed: Vec<(String, Checksum)> = Vec::with_capacity(manifest.len());
        for entry in manifest.entries() {
            let member = Key::new(entry.key.as_str());
            match ctx.storage.load_entry(&member) {
                Ok((_, actual)) => {
                    if entry.checksum.as_ref() != Some(&actual) {
                        invalid.push(member);
                    }
                    recomputed.push((entry.key.clone(), actual));
                }
                Err(e) if e.is_not_found() => {
                    invalid.push(member);
                    if let Some(recorded) = &entry.checksum {
                        recomputed.push((entry.key.clone(), recorded.clone()));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Some(checksum_collection(
            recomputed.iter().map(|(key, checksum)| (key.as_str(), checksum)),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{event, sample_version, Fixture};
    use canon_store::CanonicalStorage;
    use canon_types::ContentType;

    #[test]
    fn every_event_kind_has_one_action() {
        let creating: Vec<EventType> = EventType::ALL
            .into_iter()
            .filter(|t| action_for(*t) == Action::Create)
            .collect();
        assert_eq!(creating, [EventType::New, EventType::Replaced, EventType::Withdrawn]);
        for event_type in EventType::ALL {
            assert_eq!(action_for(event_type) == Action::Create, event_type.creates_version());
        }
    }

    #[test]
    fn create_stores_members_and_manifest() {
        let fixture = Fixture::new();
        let version = sample_version("2901.00345v1");
        let ctx = fixture.context();
        let node = RegisterVersion::create(&ctx, &version.identifier, &[event(&version, EventType::New, 0)]).unwrap();

        assert_eq!(node.integrity().manifest().len(), 3);
        for entry in node.integrity().members() {
            assert!(fixture.storage.exists(&entry.key).unwrap(), "{} not stored", entry.key);
        }
        let stored = fixture.storage.load_manifest(&node.integrity().manifest_key()).unwrap();
        assert_eq!(&stored, node.integrity().manifest());
    }

    #[test]
    fn updating_a_missing_version_is_inconsistent() {
        let fixture = Fixture::new();
        let version = sample_version("2901.00345v1");
        let result = RegisterVersion::create(
            &fixture.context(),
            &version.identifier,
            &[event(&version, EventType::Updated, 0)],
        );
        assert!(matches!(result, Err(RegisterError::Consistency(_))));
    }

    #[test]
    fn creating_an_existing_version_is_inconsistent() {
        let fixture = Fixture::new();
        let version = sample_version("2901.00345v1");
        let ctx = fixture.context();
        let mut node = RegisterVersion::create(&ctx, &version.identifier, &[event(&version, EventType::New, 0)]).unwrap();
        let result = node.add_events(&ctx, &[event(&version, EventType::Replaced, 1)]);
        assert!(matches!(result, Err(RegisterError::Consistency(_))));
    }

    #[test]
    fn unchanged_files_are_not_rewritten() {
        let fixture = Fixture::new();
        let version = sample_version("2901.00345v1");
        let ctx = fixture.context();
        let mut node = RegisterVersion::create(&ctx, &version.identifier, &[event(&version, EventType::New, 0)]).unwrap();
        let pdf = RecordFile::make_key(&version.identifier, version.render.as_ref().unwrap());
        let before = node.integrity().member(&pdf).unwrap().checksum().clone();

        let mut updated = version.clone();
        updated.metadata.title = "A better title".into();
        node.add_events(&ctx, &[event(&updated, EventType::Updated, 1)]).unwrap();

        assert_eq!(node.integrity().member(&pdf).unwrap().checksum(), &before);
        assert_eq!(node.to_domain().metadata.title, "A better title");
        assert!(node.integrity().is_valid().unwrap());
    }

    #[test]
    fn new_format_is_added_to_the_manifest() {
        let fixture = Fixture::new();
        fixture.blobs.put("/data/2901.00345v1.abs", b"Title: A record");
        let version = sample_version("2901.00345v1");
        let ctx = fixture.context();
        let mut node = RegisterVersion::create(&ctx, &version.identifier, &[event(&version, EventType::New, 0)]).unwrap();

        let mut updated = version.clone();
        updated.formats.insert(
            ContentType::Abs,
            crate::testing::file("/data/2901.00345v1.abs", ContentType::Abs),
        );
        node.add_events(&ctx, &[event(&updated, EventType::Migrate, 1)]).unwrap();

        let abs = Key::new("e-prints/2029/01/2901.00345/v1/2901.00345v1.abs");
        assert_eq!(node.integrity().manifest().len(), 4);
        assert_eq!(&fixture.storage.read(&abs).unwrap()[..], b"Title: A record");
        assert!(node.integrity().is_valid().unwrap());
    }

    #[test]
    fn loaded_version_matches_created() {
        let fixture = Fixture::new();
        let version = sample_version("2901.00345v1");
        let ctx = fixture.context();
        let created = RegisterVersion::create(&ctx, &version.identifier, &[event(&version, EventType::New, 0)]).unwrap();
        let loaded = RegisterVersion::load(&ctx, &version.identifier).unwrap();
        assert_eq!(loaded.checksum(), created.checksum());
        assert_eq!(loaded.to_domain(), created.to_domain());
        assert!(loaded.integrity().invalid_members().unwrap().is_empty());
    }

    #[test]
    fn loading_an_absent_version_is_no_such_resource() {
        let fixture = Fixture::new();
        let vid = VersionedIdentifier::parse("2901.00345v9").unwrap();
        assert!(matches!(
            RegisterVersion::load(&fixture.context(), &vid),
            Err(RegisterError::NoSuchResource(_))
        ));
    }

    #[test]
    fn history_merges_without_duplicates() {
        let version = sample_version("2901.00345v1");
        let first = event(&version, EventType::New, 0).summary();
        let second = event(&version, EventType::Updated, 1).summary();
        let merged = merge_history(&[first.clone()], &[first.clone(), second.clone()]);
        assert_eq!(merged, [first, second]);
    }
}
