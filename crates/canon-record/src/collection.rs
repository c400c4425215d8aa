use std::collections::BTreeSet;
use std::fmt;

use canon_types::Key;

use crate::error::RecordResult;
use crate::level::Level;

/// A named collection at one level of the hierarchy and the names of its
/// members.
///
/// Holds names only; member content lives in the members' own records.
pub struct RecordCollection<L: Level> {
    pub name: L::Name,
    members: BTreeSet<L::MemberName>,
}

impl<L: Level> RecordCollection<L> {
    pub fn new(name: L::Name) -> Self {
        Self {
            name,
            members: BTreeSet::new(),
        }
    }

    /// Rebuild a collection from the entry keys of its stored manifest.
    pub fn from_manifest_names<'a, I>(name: L::Name, entries: I) -> RecordResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let members = entries
            .into_iter()
            .map(|entry| L::parse_manifest_name(&name, entry))
            .collect::<RecordResult<BTreeSet<_>>>()?;
        Ok(Self { name, members })
    }

    pub fn make_manifest_key(name: &L::Name) -> Key {
        L::manifest_key(name)
    }

    pub fn manifest_key(&self) -> Key {
        L::manifest_key(&self.name)
    }

    pub fn contains(&self, member: &L::MemberName) -> bool {
        self.members.contains(member)
    }

    /// Returns `false` if the member was already present.
    pub fn insert(&mut self, member: L::MemberName) -> bool {
        self.members.insert(member)
    }

    pub fn remove(&mut self, member: &L::MemberName) -> bool {
        self.members.remove(member)
    }

    pub fn members(&self) -> impl Iterator<Item = &L::MemberName> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<L: Level> Clone for RecordCollection<L> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            members: self.members.clone(),
        }
    }
}

impl<L: Level> fmt::Debug for RecordCollection<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCollection")
            .field("level", &L::LABEL)
            .field("name", &self.name)
            .field("members", &self.members.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{EPrintDayLevel, EPrintLevel};
    use canon_types::{Identifier, VersionedIdentifier};
    use chrono::NaiveDate;

    #[test]
    fn member_names_are_unique() {
        let id = Identifier::parse("1901.00123").unwrap();
        let mut eprint = RecordCollection::<EPrintLevel>::new(id);
        let v1 = VersionedIdentifier::parse("1901.00123v1").unwrap();
        assert!(eprint.insert(v1.clone()));
        assert!(!eprint.insert(v1.clone()));
        assert_eq!(eprint.len(), 1);
        assert!(eprint.contains(&v1));
        assert_eq!(
            eprint.manifest_key().as_str(),
            "e-prints/2019/01/1901.00123.manifest.json"
        );
    }

    #[test]
    fn rebuilt_from_manifest_names() {
        let day = NaiveDate::from_ymd_opt(2019, 1, 2).unwrap();
        let collection =
            RecordCollection::<EPrintDayLevel>::from_manifest_names(day, ["1901.00124", "1901.00123"]).unwrap();
        let names: Vec<String> = collection.members().map(|id| id.to_string()).collect();
        assert_eq!(names, ["1901.00123", "1901.00124"]);
    }

    #[test]
    fn foreign_manifest_name_is_rejected() {
        let id = Identifier::parse("1901.00123").unwrap();
        let result = RecordCollection::<EPrintLevel>::from_manifest_names(id, ["1901.00999v1"]);
        assert!(result.is_err());
    }
}
