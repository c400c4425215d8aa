use canon_crypto::{checksum_reader, Checksum};
use canon_record::{RecordListing, RecordStream};
use canon_types::Key;

use crate::error::{IntegrityError, IntegrityResult};
use crate::manifest::ManifestEntry;

/// Integrity state of one leaf entry.
///
/// A leaf has no manifest; its checksum is taken over the stream content.
#[derive(Clone, Debug)]
pub struct IntegrityEntry {
    pub key: Key,
    pub stream: RecordStream,
    checksum: Checksum,
}

impl IntegrityEntry {
    /// Hash the stream and bind the result to the key.
    pub fn from_stream(key: Key, stream: RecordStream) -> IntegrityResult<Self> {
        let checksum = Self::calculate_checksum(&stream)?;
        Ok(Self { key, stream, checksum })
    }

    /// Bind a checksum taken from a trusted manifest without reading the
    /// stream.
    pub fn with_checksum(key: Key, stream: RecordStream, checksum: Checksum) -> Self {
        Self { key, stream, checksum }
    }

    /// Checksum of the full stream content, read from offset zero.
    pub fn calculate_checksum(stream: &RecordStream) -> IntegrityResult<Checksum> {
        let mut reader = stream.reader()?;
        Ok(checksum_reader(&mut reader)?)
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn is_valid(&self) -> IntegrityResult<bool> {
        Ok(Self::calculate_checksum(&self.stream)? == self.checksum)
    }

    /// Fail with [`IntegrityError::Validation`] if the content changed.
    pub fn validate(&self) -> IntegrityResult<()> {
        let actual = Self::calculate_checksum(&self.stream)?;
        if actual != self.checksum {
            return Err(IntegrityError::Validation {
                key: self.key.to_string(),
                expected: self.checksum.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// This entry as listed in a version manifest.
    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry::file(
            self.key.as_str(),
            self.checksum.clone(),
            self.stream.size_bytes,
            self.stream.mime_type(),
        )
    }
}

/// Integrity state of a listing file, which also carries event counts.
#[derive(Clone, Debug)]
pub struct IntegrityListing {
    pub record: RecordListing,
    pub entry: IntegrityEntry,
}

impl IntegrityListing {
    pub fn from_record(record: RecordListing) -> IntegrityResult<Self> {
        let entry = IntegrityEntry::from_stream(record.key.clone(), record.stream.clone())?;
        Ok(Self { record, entry })
    }

    pub fn checksum(&self) -> &Checksum {
        self.entry.checksum()
    }

    /// This listing as listed in its day's manifest.
    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry::listing(
            self.record.key.as_str(),
            self.entry.checksum().clone(),
            self.record.size_bytes(),
            self.record.stream.mime_type(),
            &self.record.domain,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canon_types::{ContentType, Listing, ListingIdentifier};
    use chrono::NaiveDate;

    #[test]
    fn leaf_checksum_hashes_content() {
        let stream = RecordStream::from_bytes(&b"%PDF-1.4"[..], ContentType::Pdf);
        let entry = IntegrityEntry::from_stream(Key::new("a/b.pdf"), stream).unwrap();
        assert_eq!(entry.checksum(), &Checksum::of_bytes(b"%PDF-1.4"));
        assert!(entry.is_valid().unwrap());

        let manifest_entry = entry.manifest_entry();
        assert_eq!(manifest_entry.key, "a/b.pdf");
        assert_eq!(manifest_entry.size_bytes, Some(8));
        assert_eq!(manifest_entry.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(manifest_entry.number_of_versions, 0);
    }

    #[test]
    fn trusted_checksum_that_does_not_match_fails_validation() {
        let stream = RecordStream::from_bytes(&b"tampered"[..], ContentType::Pdf);
        let entry = IntegrityEntry::with_checksum(Key::new("a/b.pdf"), stream, Checksum::of_bytes(b"original"));
        assert!(!entry.is_valid().unwrap());
        assert!(matches!(entry.validate(), Err(IntegrityError::Validation { .. })));
    }

    #[test]
    fn empty_listing_has_no_events() {
        let date = NaiveDate::from_ymd_opt(2029, 1, 29).unwrap();
        let listing = Listing::empty(ListingIdentifier::new(date, "foo").unwrap());
        let record = RecordListing::from_domain(&listing).unwrap();
        let integrity = IntegrityListing::from_record(record).unwrap();
        let entry = integrity.manifest_entry();
        assert_eq!(entry.key, "announcement/2029/01/29/2029-01-29-foo.json");
        assert_eq!(entry.number_of_events, 0);
        assert!(entry.number_of_events_by_type.is_empty());
    }
}
