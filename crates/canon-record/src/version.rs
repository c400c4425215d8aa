use std::collections::BTreeMap;

use canon_source::SourceList;
use canon_types::{CanonicalFile, ContentType, Key, Version, VersionedIdentifier};

use crate::entry::{version_prefix, version_stem, RecordFile, RecordMetadata};
use crate::error::RecordResult;
use crate::stream::RecordStream;

/// Borrowed view of one member of a version.
#[derive(Clone, Copy, Debug)]
pub struct MemberRef<'a> {
    pub key: &'a Key,
    pub stream: &'a RecordStream,
    /// File descriptor; `None` for the metadata entry.
    pub file: Option<&'a CanonicalFile>,
}

/// The entries that make up one version of an e-print.
///
/// Every file descriptor inside `metadata` references its own canonical
/// key, so the metadata never points outside the record.
#[derive(Clone, Debug)]
pub struct RecordVersion {
    pub identifier: VersionedIdentifier,
    pub metadata: RecordMetadata,
    pub source: RecordFile,
    pub render: Option<RecordFile>,
    pub formats: BTreeMap<ContentType, RecordFile>,
}

impl RecordVersion {
    /// `e-prints/{yyyy}/{mm}/{id}/{id}v{n}.manifest.json`, beside the
    /// version's own directory.
    pub fn make_manifest_key(vid: &VersionedIdentifier) -> Key {
        let prefix = version_prefix(vid);
        let parent = prefix.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("");
        Key::new(format!("{parent}/{}.manifest.json", version_stem(vid)))
    }

    /// Bind a version and its files to their keys.
    ///
    /// File content is resolved through `sources` lazily; nothing is read
    /// here. The stored metadata is the canonicalized version.
    pub fn from_domain(version: &Version, sources: &SourceList) -> RecordResult<Self> {
        let vid = &version.identifier;
        let bind = |file: &CanonicalFile| RecordFile::from_domain(RecordFile::make_key(vid, file), file, sources);

        let source = bind(&version.source)?;
        let render = version.render.as_ref().map(&bind).transpose()?;
        let mut formats = BTreeMap::new();
        for (content_type, file) in &version.formats {
            formats.insert(*content_type, bind(file)?);
        }

        let mut canonical = version.clone();
        canonical.source = source.to_domain();
        canonical.render = render.as_ref().map(RecordFile::to_domain);
        canonical.formats = formats.iter().map(|(ct, entry)| (*ct, entry.to_domain())).collect();

        Ok(Self {
            identifier: vid.clone(),
            metadata: RecordMetadata::from_domain(&canonical)?,
            source,
            render,
            formats,
        })
    }

    /// Rebuild a version from its stored metadata entry.
    ///
    /// The metadata bytes are kept as stored; file entries resolve through
    /// `sources`, which must be able to read canonical references.
    pub fn from_metadata(metadata: RecordMetadata, sources: &SourceList) -> RecordResult<Self> {
        let rebuilt = Self::from_domain(&metadata.domain, sources)?;
        Ok(Self { metadata, ..rebuilt })
    }

    pub fn to_domain(&self) -> Version {
        self.metadata.domain.clone()
    }

    /// Every member keyed by its entry key.
    pub fn members(&self) -> BTreeMap<Key, MemberRef<'_>> {
        let mut members = BTreeMap::new();
        members.insert(
            self.metadata.key.clone(),
            MemberRef {
                key: &self.metadata.key,
                stream: &self.metadata.stream,
                file: None,
            },
        );
        for file in self.files() {
            members.insert(
                file.key.clone(),
                MemberRef {
                    key: &file.key,
                    stream: &file.stream,
                    file: Some(&file.domain),
                },
            );
        }
        members
    }

    /// File entries: source, then render, then extra formats.
    pub fn files(&self) -> impl Iterator<Item = &RecordFile> {
        std::iter::once(&self.source)
            .chain(self.render.iter())
            .chain(self.formats.values())
    }
}
