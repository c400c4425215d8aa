use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::event::EventSummary;
use crate::file::{CanonicalFile, ContentType};
use crate::identifier::VersionedIdentifier;

/// A person associated with a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub full_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub orcid: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub affiliation: Vec<String>,
}

/// License under which a version is distributed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub href: String,
}

/// Descriptive metadata of one version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub primary_classification: String,
    #[serde(default)]
    pub secondary_classification: Vec<String>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_: String,
    pub authors: String,
    pub license: License,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub journal_ref: Option<String>,
    #[serde(default)]
    pub report_num: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub msc_class: Option<String>,
    #[serde(default)]
    pub acm_class: Option<String>,
}

/// Pointer from a version to one of its predecessors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReference {
    pub identifier: VersionedIdentifier,
    pub submitted_date: DateTime<Utc>,
    #[serde(default)]
    pub announced_date: Option<NaiveDate>,
}

/// One immutable snapshot of an e-print.
///
/// `announced_date_first` is shared by every version of an e-print and
/// determines the announcement day the e-print is filed under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub identifier: VersionedIdentifier,
    pub announced_date: NaiveDate,
    pub announced_date_first: NaiveDate,
    pub submitted_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub metadata: Metadata,
    #[serde(default)]
    pub events: Vec<EventSummary>,
    #[serde(default)]
    pub previous_versions: Vec<VersionReference>,
    #[serde(default)]
    pub submitter: Option<Person>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub is_announced: bool,
    #[serde(default)]
    pub is_withdrawn: bool,
    #[serde(default)]
    pub reason_for_withdrawal: Option<String>,
    #[serde(default)]
    pub is_legacy: bool,
    pub source: CanonicalFile,
    #[serde(default)]
    pub render: Option<CanonicalFile>,
    #[serde(default)]
    pub formats: BTreeMap<ContentType, CanonicalFile>,
    #[serde(default)]
    pub source_type: Option<String>,
}

impl Version {
    pub fn size_kilobytes(&self) -> u64 {
        self.source.size_bytes.div_ceil(1024)
    }

    pub fn number_of_events(&self) -> usize {
        self.events.len()
    }

    /// Record that an event touched this version.
    pub fn add_event_summary(&mut self, summary: EventSummary) {
        self.events.push(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Uri;
    use chrono::TimeZone;

    fn sample_version() -> Version {
        let ts = Utc.with_ymd_and_hms(2019, 1, 1, 12, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2019, 1, 2).unwrap();
        Version {
            identifier: VersionedIdentifier::parse("1901.00123v1").unwrap(),
            announced_date: date,
            announced_date_first: date,
            submitted_date: ts,
            updated_date: ts,
            metadata: Metadata {
                primary_classification: "cs.DL".into(),
                title: "On canonical records".into(),
                abstract_: "We describe a record.".into(),
                authors: "A. Author, B. Author".into(),
                license: License {
                    href: "http://creativecommons.org/licenses/by/4.0/".into(),
                },
                ..Default::default()
            },
            events: vec![],
            previous_versions: vec![],
            submitter: None,
            proxy: None,
            is_announced: true,
            is_withdrawn: false,
            reason_for_withdrawal: None,
            is_legacy: false,
            source: CanonicalFile {
                created: ts,
                modified: ts,
                size_bytes: 2049,
                content_type: ContentType::Targz,
                filename: Some("1901.00123v1.tar.gz".into()),
                reference: Uri::parse("/data/1901.00123v1.tar.gz").unwrap(),
                is_gzipped: false,
            },
            render: None,
            formats: BTreeMap::new(),
            source_type: Some("tex".into()),
        }
    }

    #[test]
    fn size_in_kilobytes_rounds_up() {
        assert_eq!(sample_version().size_kilobytes(), 3);
    }

    #[test]
    fn abstract_uses_reserved_word_on_the_wire() {
        let value = serde_json::to_value(sample_version()).unwrap();
        assert_eq!(value["metadata"]["abstract"], "We describe a record.");
        assert!(value["metadata"].get("abstract_").is_none());
    }

    #[test]
    fn json_round_trip_preserves_version() {
        let version = sample_version();
        let json = serde_json::to_vec(&version).unwrap();
        let back: Version = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, version);
        assert_eq!(back.source.reference, version.source.reference);
    }
}
