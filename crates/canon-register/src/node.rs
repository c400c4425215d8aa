use std::collections::BTreeMap;
use std::fmt;

use canon_crypto::{checksum_collection, Checksum};
use canon_integrity::{IntegrityCollection, IntegrityError, ManifestEntry};
use canon_record::{Level, RecordCollection};
use canon_source::SourceList;
use canon_store::CanonicalStorage;
use canon_types::{Event, Key};
use tracing::{debug, info};

use crate::error::{RegisterError, RegisterResult};

/// Storage and content sources a register operation runs against.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub storage: &'a dyn CanonicalStorage,
    pub sources: &'a SourceList,
}

impl<'a> Context<'a> {
    pub fn new(storage: &'a dyn CanonicalStorage, sources: &'a SourceList) -> Self {
        Self { storage, sources }
    }
}

/// One node of the register tree.
pub trait RegisterNode: Clone + Sized {
    type Name: Clone + Ord + fmt::Debug;

    /// Build a node that does not exist yet from the events that bring it
    /// into being, persisting everything it holds.
    fn create(ctx: &Context<'_>, name: &Self::Name, events: &[Event]) -> RegisterResult<Self>;

    /// Reconstruct a node from storage.
    fn load(ctx: &Context<'_>, name: &Self::Name) -> RegisterResult<Self>;

    /// Apply events to an existing node, persisting whatever changes.
    fn add_events(&mut self, ctx: &Context<'_>, events: &[Event]) -> RegisterResult<()>;

    fn checksum(&self) -> &Checksum;

    /// This node as its parent's manifest records it.
    fn manifest_entry(&self, name_in_parent: String) -> ManifestEntry;

    /// Key whose stored content this node's checksum covers.
    fn stored_key(name: &Self::Name) -> Key;

    /// Recompute the checksum of the stored node from its leaves.
    ///
    /// Every key whose stored state disagrees with what was recomputed is
    /// pushed to `invalid`. Returns `None` when the node cannot be read.
    fn verify(ctx: &Context<'_>, name: &Self::Name, invalid: &mut Vec<Key>) -> RegisterResult<Option<Checksum>>;
}

/// A collection level together with the node type of its members.
pub trait RegisterLevel: Level {
    type Child: RegisterNode<Name = Self::MemberName>;
}

/// A collection node: its integrity state plus whichever members have been
/// loaded so far.
///
/// Members are loaded on first use; the manifest is the authority on which
/// members exist.
pub struct RegisterCollection<L: RegisterLevel> {
    integrity: IntegrityCollection<L>,
    members: BTreeMap<L::MemberName, L::Child>,
}

impl<L: RegisterLevel> RegisterCollection<L> {
    pub fn name(&self) -> &L::Name {
        &self.integrity.name
    }

    pub fn integrity(&self) -> &IntegrityCollection<L> {
        &self.integrity
    }

    /// Whether the member is known, loaded or not.
    pub fn contains(&self, member: &L::MemberName) -> bool {
        self.members.contains_key(member) || self.integrity.manifest().contains(&L::manifest_name(member))
    }

    /// Names of every member in the manifest.
    pub fn member_names(&self) -> RegisterResult<Vec<L::MemberName>> {
        let entries = self.integrity.manifest().entries().iter().map(|entry| entry.key.as_str());
        let record = RecordCollection::<L>::from_manifest_names(self.name().clone(), entries)?;
        Ok(record.members().cloned().collect())
    }

    /// A member, loading it from storage on first access.
    pub fn member(&mut self, ctx: &Context<'_>, member: &L::MemberName) -> RegisterResult<&mut L::Child> {
        if !self.members.contains_key(member) {
            if !self.contains(member) {
                return Err(RegisterError::NoSuchResource(format!("{} {member:?}", L::LABEL)));
            }
            let child = L::Child::load(ctx, member)?;
            if let Some(recorded) = self.integrity.member_checksum(member) {
                if recorded != child.checksum() {
                    return Err(IntegrityError::Validation {
                        key: L::Child::stored_key(member).to_string(),
                        expected: recorded.to_string(),
                        actual: child.checksum().to_string(),
                    }
                    .into());
                }
            }
            self.members.insert(member.clone(), child);
        }
        self.members
            .get_mut(member)
            .ok_or_else(|| RegisterError::NoSuchResource(format!("{} {member:?}", L::LABEL)))
    }

    /// Number of members currently held in memory.
    pub fn loaded(&self) -> usize {
        self.members.len()
    }

    /// Drop every loaded member. The manifest stays, so members load again
    /// from storage on next use.
    pub fn unload(&mut self) {
        self.members.clear();
    }

    fn empty(name: L::Name) -> RegisterResult<Self> {
        Ok(Self {
            integrity: IntegrityCollection::new(name)?,
            members: BTreeMap::new(),
        })
    }
}

impl<L: RegisterLevel> RegisterNode for RegisterCollection<L> {
    type Name = L::Name;

    fn create(ctx: &Context<'_>, name: &L::Name, events: &[Event]) -> RegisterResult<Self> {
        let mut collection = Self::empty(name.clone())?;
        collection.add_events(ctx, events)?;
        Ok(collection)
    }

    /// A collection with no stored manifest loads empty.
    fn load(ctx: &Context<'_>, name: &L::Name) -> RegisterResult<Self> {
        let key = L::manifest_key(name);
        match ctx.storage.load_manifest(&key) {
            Ok(manifest) => {
                debug!(level = L::LABEL, key = %key, entries = manifest.len(), "loaded collection");
                Ok(Self {
                    integrity: IntegrityCollection::from_manifest(name.clone(), manifest)?,
                    members: BTreeMap::new(),
                })
            }
            Err(e) if e.is_not_found() => Self::empty(name.clone()),
            Err(e) => Err(e.into()),
        }
    }

    fn add_events(&mut self, ctx: &Context<'_>, events: &[Event]) -> RegisterResult<()> {
        let mut groups: BTreeMap<L::MemberName, Vec<Event>> = BTreeMap::new();
        for event in events {
            for member in L::members_for_event(event) {
                groups.entry(member).or_default().push(event.clone());
            }
        }
        if groups.is_empty() {
            return Ok(());
        }

        for (member, events) in groups {
            let entry_name = L::manifest_name(&member);
            if self.contains(&member) {
                let child = self.member(ctx, &member)?;
                child.add_events(ctx, &events)?;
                let entry = child.manifest_entry(entry_name);
                self.integrity.update_or_extend_manifest(entry)?;
            } else {
                let child = L::Child::create(ctx, &member, &events)?;
                self.integrity.extend_manifest(child.manifest_entry(entry_name))?;
                self.members.insert(member, child);
            }
        }

        let key = self.integrity.manifest_key();
        ctx.storage.store_manifest(&key, self.integrity.manifest())?;
        info!(
            level = L::LABEL,
            name = ?self.name(),
            checksum = %self.integrity.checksum(),
            "collection updated"
        );
        Ok(())
    }

    fn checksum(&self) -> &Checksum {
        self.integrity.checksum()
    }

    fn manifest_entry(&self, name_in_parent: String) -> ManifestEntry {
        self.integrity.manifest_entry(name_in_parent)
    }

    fn stored_key(name: &L::Name) -> Key {
        L::manifest_key(name)
    }

    fn verify(ctx: &Context<'_>, name: &L::Name, invalid: &mut Vec<Key>) -> RegisterResult<Option<Checksum>> {
        let key = L::manifest_key(name);
        let manifest = match ctx.storage.load_manifest(&key) {
            Ok(manifest) => manifest,
            Err(e) if e.is_not_found() => {
                invalid.push(key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if !manifest.is_consistent() {
            invalid.push(key.clone());
        }

        let mut recomputed: Vec<(String, Checksum)> = Vec::with_capacity(manifest.len());
        for entry in manifest.entries() {
            let member = match L::parse_manifest_name(name, &entry.key) {
                Ok(member) => member,
                Err(_) => {
                    invalid.push(key.clone());
                    continue;
                }
            };
            let actual = L::Child::verify(ctx, &member, invalid)?;
            if actual.is_none() || actual != entry.checksum {
                let child_key = L::Child::stored_key(&member);
                if !invalid.contains(&child_key) {
                    invalid.push(child_key);
                }
            }
            // An unreadable child keeps the checksum its parent recorded.
            match actual.or_else(|| entry.checksum.clone()) {
                Some(checksum) => recomputed.push((entry.key.clone(), checksum)),
                None => invalid.push(key.clone()),
            }
        }
        Ok(Some(checksum_collection(
            recomputed.iter().map(|(key, checksum)| (key.as_str(), checksum)),
        )))
    }
}

impl<L: RegisterLevel> Clone for RegisterCollection<L> {
    fn clone(&self) -> Self {
        Self {
            integrity: self.integrity.clone(),
            members: self.members.clone(),
        }
    }
}

impl<L: RegisterLevel> fmt::Debug for RegisterCollection<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterCollection")
            .field("level", &L::LABEL)
            .field("name", self.name())
            .field("checksum", self.integrity.checksum())
            .field("loaded", &self.members.len())
            .finish()
    }
}
