use canon_source::{dereference, SourceList};
use canon_types::{CanonicalFile, ContentType, Key, Listing, ListingIdentifier, Version, VersionedIdentifier};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RecordError, RecordResult};
use crate::stream::RecordStream;

/// A leaf of the record: a key, the bytes stored there, and the domain
/// object those bytes represent.
#[derive(Clone, Debug)]
pub struct RecordEntry<D> {
    pub key: Key,
    pub stream: RecordStream,
    pub domain: D,
}

/// Descriptive record of one version.
pub type RecordMetadata = RecordEntry<Version>;

/// Opaque bitstream such as a source package or a rendered PDF.
pub type RecordFile = RecordEntry<CanonicalFile>;

/// The events of one listing shard.
pub type RecordListing = RecordEntry<Listing>;

impl<D> RecordEntry<D> {
    pub fn size_bytes(&self) -> u64 {
        self.stream.size_bytes
    }

    pub fn content_type(&self) -> ContentType {
        self.stream.content_type
    }
}

fn encode_json<T: Serialize>(key: &Key, value: &T) -> RecordResult<RecordStream> {
    let data = serde_json::to_vec(value).map_err(|e| RecordError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(RecordStream::from_bytes(data, ContentType::Json))
}

fn decode_json<T: DeserializeOwned>(key: &Key, stream: &RecordStream) -> RecordResult<T> {
    let data = stream.bytes()?;
    serde_json::from_slice(&data).map_err(|e| RecordError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Directory holding every entry of a version.
///
/// New-style identifiers: `e-prints/{yyyy}/{mm}/{id}/v{n}`. Old-style
/// identifiers nest the archive above the numeric part, which falls out of
/// the `/` already present in the identifier.
pub fn version_prefix(vid: &VersionedIdentifier) -> String {
    format!(
        "e-prints/{}/{:02}/{}/v{}",
        vid.year(),
        vid.month(),
        vid.arxiv_id(),
        vid.version()
    )
}

/// `{numeric part}v{n}`, the stem used for files named after a version.
pub fn version_stem(vid: &VersionedIdentifier) -> String {
    format!("{}v{}", vid.arxiv_id().numeric_part(), vid.version())
}

impl RecordEntry<Version> {
    pub fn make_key(vid: &VersionedIdentifier) -> Key {
        Key::new(format!("{}/{}.json", version_prefix(vid), version_stem(vid)))
    }

    pub fn from_domain(version: &Version) -> RecordResult<Self> {
        let key = Self::make_key(&version.identifier);
        let stream = encode_json(&key, version)?;
        Ok(Self {
            key,
            stream,
            domain: version.clone(),
        })
    }

    pub fn to_domain(key: &Key, stream: &RecordStream) -> RecordResult<Version> {
        decode_json(key, stream)
    }

    /// Rebuild an entry from stored content.
    pub fn from_stream(key: Key, stream: RecordStream) -> RecordResult<Self> {
        let domain = Self::to_domain(&key, &stream)?;
        Ok(Self { key, stream, domain })
    }
}

impl RecordEntry<CanonicalFile> {
    /// Key of a file belonging to a version.
    ///
    /// Files without a name are named after the version and content type.
    pub fn make_key(vid: &VersionedIdentifier, file: &CanonicalFile) -> Key {
        let filename = match &file.filename {
            Some(name) => name.clone(),
            None => format!("{}.{}", version_stem(vid), file.content_type.ext()),
        };
        Key::new(format!("{}/{}", version_prefix(vid), filename))
    }

    /// Bind a file descriptor to its key, resolving its content lazily.
    ///
    /// The returned domain object references its canonical key rather than
    /// wherever the content came from.
    pub fn from_domain(key: Key, file: &CanonicalFile, sources: &SourceList) -> RecordResult<Self> {
        let content = dereference(sources, &file.reference)?;
        let stream = RecordStream::deferred(content, file.content_type, file.size_bytes);
        let domain = file.with_reference(key.to_uri());
        Ok(Self { key, stream, domain })
    }

    /// The file descriptor; bytes are passed through uninterpreted.
    pub fn to_domain(&self) -> CanonicalFile {
        self.domain.clone()
    }

    /// The descriptor already points at this entry's own key, so it carries
    /// no new content.
    pub fn refers_to_itself(file: &CanonicalFile, key: &Key) -> bool {
        Key::from_uri(&file.reference).as_ref() == Some(key)
    }
}

impl RecordEntry<Listing> {
    pub fn make_key(id: &ListingIdentifier) -> Key {
        Key::new(format!(
            "{}-{}.json",
            id.date().format("announcement/%Y/%m/%d/%Y-%m-%d"),
            id.shard()
        ))
    }

    pub fn from_domain(listing: &Listing) -> RecordResult<Self> {
        let key = Self::make_key(&listing.identifier);
        let stream = encode_json(&key, listing)?;
        Ok(Self {
            key,
            stream,
            domain: listing.clone(),
        })
    }

    pub fn to_domain(key: &Key, stream: &RecordStream) -> RecordResult<Listing> {
        decode_json(key, stream)
    }

    pub fn from_stream(key: Key, stream: RecordStream) -> RecordResult<Self> {
        let domain = Self::to_domain(&key, &stream)?;
        Ok(Self { key, stream, domain })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::tests::sample_version;
    use canon_source::{ContentSource, MemoizedReadable, SourceResult};
    use canon_types::{Event, EventType, Uri};
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::Arc;

    struct Echo;

    impl ContentSource for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn can_resolve(&self, uri: &Uri) -> bool {
            uri.is_file()
        }

        fn load_deferred(&self, uri: &Uri) -> SourceResult<MemoizedReadable> {
            Ok(MemoizedReadable::from_bytes(uri.path().as_bytes().to_vec()))
        }
    }

    #[test]
    fn metadata_key_layout() {
        let vid = VersionedIdentifier::parse("1901.00123v2").unwrap();
        assert_eq!(
            RecordMetadata::make_key(&vid).as_str(),
            "e-prints/2019/01/1901.00123/v2/1901.00123v2.json"
        );
        let old = VersionedIdentifier::parse("hep-th/9901001v1").unwrap();
        assert_eq!(
            RecordMetadata::make_key(&old).as_str(),
            "e-prints/1999/01/hep-th/9901001/v1/9901001v1.json"
        );
    }

    #[test]
    fn listing_key_layout() {
        let id = ListingIdentifier::new(NaiveDate::from_ymd_opt(2029, 1, 29).unwrap(), "foo").unwrap();
        assert_eq!(
            RecordListing::make_key(&id).as_str(),
            "announcement/2029/01/29/2029-01-29-foo.json"
        );
    }

    #[test]
    fn metadata_round_trip() {
        let version = sample_version("1901.00123v1");
        let entry = RecordMetadata::from_domain(&version).unwrap();
        assert_eq!(entry.content_type(), ContentType::Json);
        assert_eq!(entry.size_bytes(), entry.stream.bytes().unwrap().len() as u64);
        let decoded = RecordMetadata::to_domain(&entry.key, &entry.stream).unwrap();
        assert_eq!(decoded, version);
    }

    #[test]
    fn listing_round_trip() {
        let version = sample_version("1901.00123v1");
        let event = Event {
            identifier: version.identifier.clone(),
            event_date: Utc.with_ymd_and_hms(2019, 1, 2, 20, 0, 0).unwrap(),
            event_type: EventType::New,
            version,
            categories: vec!["cs.DL".into()],
            description: String::new(),
            is_legacy: false,
            event_agent: None,
        };
        let mut listing = Listing::empty(event.listing_identifier());
        listing.events.push(event);
        let entry = RecordListing::from_domain(&listing).unwrap();
        let decoded = RecordListing::to_domain(&entry.key, &entry.stream).unwrap();
        assert_eq!(decoded, listing);
    }

    #[test]
    fn undecodable_metadata_is_an_error() {
        let key = Key::new("e-prints/2019/01/1901.00123/v1/1901.00123v1.json");
        let stream = RecordStream::from_bytes(&b"{not json"[..], ContentType::Json);
        assert!(matches!(
            RecordMetadata::to_domain(&key, &stream),
            Err(RecordError::Decode { .. })
        ));
    }

    #[test]
    fn file_entry_points_at_its_key() {
        let version = sample_version("1901.00123v1");
        let sources: Vec<Arc<dyn ContentSource>> = vec![Arc::new(Echo)];
        let key = RecordFile::make_key(&version.identifier, &version.source);
        assert_eq!(key.as_str(), "e-prints/2019/01/1901.00123/v1/1901.00123v1.tar.gz");

        let entry = RecordFile::from_domain(key.clone(), &version.source, &sources).unwrap();
        assert_eq!(entry.to_domain().reference, key.to_uri());
        assert!(RecordFile::refers_to_itself(&entry.to_domain(), &key));
        assert!(!RecordFile::refers_to_itself(&version.source, &key));
        assert_eq!(&entry.stream.bytes().unwrap()[..], b"/data/1901.00123v1.tar.gz");
    }

    #[test]
    fn unnamed_files_are_named_after_the_version() {
        let version = sample_version("1901.00123v1");
        let mut pdf = version.source.clone();
        pdf.filename = None;
        pdf.content_type = ContentType::Pdf;
        assert_eq!(
            RecordFile::make_key(&version.identifier, &pdf).as_str(),
            "e-prints/2019/01/1901.00123/v1/1901.00123v1.pdf"
        );
    }

    #[test]
    fn unresolvable_file_reference_fails() {
        let version = sample_version("1901.00123v1");
        let key = RecordFile::make_key(&version.identifier, &version.source);
        assert!(matches!(
            RecordFile::from_domain(key, &version.source, &[]),
            Err(RecordError::Source(_))
        ));
    }
}
