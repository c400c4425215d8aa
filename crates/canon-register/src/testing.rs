//! Fixtures shared by the register tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use canon_source::{ContentSource, MemoizedReadable, SourceError, SourceResult};
use canon_store::{CanonicalSource, CanonicalStorage, InMemoryStorage};
use canon_types::{
    CanonicalFile, ContentType, Event, EventType, License, Metadata, Uri, Version, VersionedIdentifier,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::node::Context;

/// Serves `file://` references from memory. Paths that were never put
/// serve `content of {path}`.
#[derive(Default)]
pub(crate) struct Blobs {
    content: Mutex<HashMap<String, Vec<u8>>>,
}

impl Blobs {
    pub(crate) fn put(&self, path: &str, data: &[u8]) {
        self.content.lock().unwrap().insert(path.to_string(), data.to_vec());
    }
}

impl ContentSource for Blobs {
    fn name(&self) -> &str {
        "blobs"
    }

    fn can_resolve(&self, uri: &Uri) -> bool {
        uri.is_file()
    }

    fn load_deferred(&self, uri: &Uri) -> SourceResult<MemoizedReadable> {
        if !self.can_resolve(uri) {
            return Err(SourceError::Unresolvable(uri.to_string()));
        }
        let path = uri.path().to_string();
        let data = self
            .content
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .unwrap_or_else(|| format!("content of {path}").into_bytes());
        Ok(MemoizedReadable::from_bytes(data))
    }
}

/// In-memory storage with the sources a register needs.
pub(crate) struct Fixture {
    pub(crate) storage: Arc<InMemoryStorage>,
    pub(crate) blobs: Arc<Blobs>,
    pub(crate) sources: Vec<Arc<dyn ContentSource>>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let blobs = Arc::new(Blobs::default());
        let canonical: Arc<dyn CanonicalStorage> = storage.clone();
        let sources: Vec<Arc<dyn ContentSource>> = vec![Arc::new(CanonicalSource::new(canonical)), blobs.clone()];
        Self { storage, blobs, sources }
    }

    pub(crate) fn context(&self) -> Context<'_> {
        Context::new(self.storage.as_ref(), &self.sources)
    }
}

pub(crate) fn file(path: &str, content_type: ContentType) -> CanonicalFile {
    let ts = Utc.with_ymd_and_hms(2029, 1, 28, 12, 0, 0).unwrap();
    CanonicalFile {
        created: ts,
        modified: ts,
        size_bytes: 1024,
        content_type,
        filename: path.rsplit('/').next().map(str::to_string),
        reference: Uri::parse(path).unwrap(),
        is_gzipped: false,
    }
}

/// A version first announced on 2029-01-29, with a source package under
/// `/data/{stem}.tar.gz` and a render under `/data/{stem}.pdf`.
pub(crate) fn sample_version(vid: &str) -> Version {
    let identifier = VersionedIdentifier::parse(vid).unwrap();
    let stem = format!("{}v{}", identifier.arxiv_id().numeric_part(), identifier.version());
    let ts = Utc.with_ymd_and_hms(2029, 1, 28, 12, 0, 0).unwrap();
    let day = NaiveDate::from_ymd_opt(2029, 1, 29).unwrap();
    Version {
        identifier,
        announced_date: day,
        announced_date_first: day,
        submitted_date: ts,
        updated_date: ts,
        metadata: Metadata {
            primary_classification: "cs.DL".into(),
            title: "On canonical records".into(),
            abstract_: "We describe a record.".into(),
            authors: "A. Author".into(),
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
        source: file(&format!("/data/{stem}.tar.gz"), ContentType::Targz),
        render: Some(file(&format!("/data/{stem}.pdf"), ContentType::Pdf)),
        formats: BTreeMap::new(),
        source_type: None,
    }
}

/// An event at 2029-01-29 20:00 UTC plus `minutes`.
pub(crate) fn event(version: &Version, event_type: EventType, minutes: i64) -> Event {
    let at = Utc.with_ymd_and_hms(2029, 1, 29, 20, 0, 0).unwrap() + Duration::minutes(minutes);
    event_at(version, event_type, at)
}

pub(crate) fn event_at(version: &Version, event_type: EventType, event_date: DateTime<Utc>) -> Event {
    Event {
        identifier: version.identifier.clone(),
        event_date,
        event_type,
        version: version.clone(),
        categories: vec![version.metadata.primary_classification.clone()],
        description: String::new(),
        is_legacy: false,
        event_agent: None,
    }
}
