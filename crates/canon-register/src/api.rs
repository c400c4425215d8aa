use std::sync::{Arc, Mutex};

use canon_crypto::Checksum;
use canon_record::RecordFile;
use canon_source::{ContentSource, MemoizedReadable};
use canon_store::{CanonicalSource, CanonicalStorage, StagedStorage};
use canon_types::{
    CanonicalFile, EPrint, Event, EventIdentifier, EventSummary, Identifier, Key, Listing, ListingIdentifier,
    Version, VersionedIdentifier, YearMonth,
};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::{RegisterError, RegisterResult};
use crate::levels::{RegisterEPrint, RegisterListingDay, RegisterListingMonth, RegisterListingYear};
use crate::listing::RegisterListing;
use crate::node::{Context, RegisterNode};
use crate::root::RegisterRoot;
use crate::version::RegisterVersion;

/// Which listings to read events from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventSelector {
    Day(NaiveDate),
    Month(YearMonth),
    Year(i32),
}

/// Whose history to read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryTarget {
    /// Every version of an e-print, oldest first.
    EPrint(Identifier),
    Version(VersionedIdentifier),
}

impl From<Identifier> for HistoryTarget {
    fn from(id: Identifier) -> Self {
        Self::EPrint(id)
    }
}

impl From<VersionedIdentifier> for HistoryTarget {
    fn from(vid: VersionedIdentifier) -> Self {
        Self::Version(vid)
    }
}

/// Entry point for reading and extending the canonical record.
///
/// Mutations are serialized. Each [`add_events`](Self::add_events) call is
/// staged in full and committed only if every event applies; a failed call
/// leaves both storage and the in-memory register as they were.
pub struct RegisterApi {
    storage: Arc<dyn CanonicalStorage>,
    /// Sources supplied by the caller, without the canonical one.
    sources: Vec<Arc<dyn ContentSource>>,
    /// The canonical source over `storage`, then `sources`.
    read_sources: Vec<Arc<dyn ContentSource>>,
    root: Mutex<RegisterRoot>,
}

fn with_canonical(
    storage: &Arc<dyn CanonicalStorage>,
    sources: &[Arc<dyn ContentSource>],
) -> Vec<Arc<dyn ContentSource>> {
    let mut all: Vec<Arc<dyn ContentSource>> = Vec::with_capacity(sources.len() + 1);
    all.push(Arc::new(CanonicalSource::new(storage.clone())));
    all.extend(sources.iter().cloned());
    all
}

impl RegisterApi {
    /// Open the register held in `storage`.
    ///
    /// `sources` resolve file references carried by incoming events. The
    /// record's own `arxiv:///` references always resolve against `storage`.
    pub fn new(storage: Arc<dyn CanonicalStorage>, sources: Vec<Arc<dyn ContentSource>>) -> RegisterResult<Self> {
        let read_sources = with_canonical(&storage, &sources);
        let root = RegisterRoot::load(&Context::new(storage.as_ref(), &read_sources))?;
        info!(checksum = %root.checksum(), "register opened");
        Ok(Self {
            storage,
            sources,
            read_sources,
            root: Mutex::new(root),
        })
    }

    fn context(&self) -> Context<'_> {
        Context::new(self.storage.as_ref(), &self.read_sources)
    }

    pub fn storage(&self) -> &Arc<dyn CanonicalStorage> {
        &self.storage
    }

    /// Checksum of the whole record.
    pub fn checksum(&self) -> RegisterResult<Checksum> {
        let root = self.root.lock().map_err(|_| RegisterError::LockPoisoned)?;
        Ok(root.checksum().clone())
    }

    pub fn add_events(&self, events: &[Event]) -> RegisterResult<()> {
        let mut root = self.root.lock().map_err(|_| RegisterError::LockPoisoned)?;
        let staged = Arc::new(StagedStorage::new(self.storage.clone()));
        let overlay: Arc<dyn CanonicalStorage> = staged.clone();
        let sources = with_canonical(&overlay, &self.sources);

        let mut working = root.clone();
        if let Err(e) = working.add_events(&Context::new(staged.as_ref(), &sources), events) {
            warn!(error = %e, events = events.len(), "rejected events; discarding staged changes");
            staged.discard()?;
            return Err(e);
        }
        let written = staged.commit()?;
        // Members reload from storage on demand; keeping them would hold
        // every ingested version and its content for the life of the API.
        working.unload();
        *root = working;
        info!(events = events.len(), keys = written, checksum = %root.checksum(), "events committed");
        Ok(())
    }

    pub fn load_version(&self, vid: &VersionedIdentifier) -> RegisterResult<Version> {
        Ok(RegisterVersion::load(&self.context(), vid)?.to_domain())
    }

    /// An e-print with every stored version.
    pub fn load_eprint(&self, id: &Identifier) -> RegisterResult<EPrint> {
        let ctx = self.context();
        let mut node = RegisterEPrint::load(&ctx, id)?;
        let mut eprint = EPrint::new(id.clone());
        for vid in node.member_names()? {
            let version = node.member(&ctx, &vid)?.to_domain();
            eprint.versions.insert(vid, version);
        }
        if eprint.versions.is_empty() {
            return Err(RegisterError::NoSuchResource(format!("e-print {id}")));
        }
        Ok(eprint)
    }

    pub fn load_history(&self, target: impl Into<HistoryTarget>) -> RegisterResult<Vec<EventSummary>> {
        match target.into() {
            HistoryTarget::EPrint(id) => Ok(self.load_eprint(&id)?.history().cloned().collect()),
            HistoryTarget::Version(vid) => Ok(self.load_version(&vid)?.events),
        }
    }

    pub fn load_listing(&self, date: NaiveDate, shard: &str) -> RegisterResult<Listing> {
        let id = ListingIdentifier::new(date, shard)?;
        Ok(RegisterListing::load(&self.context(), &id)?.listing().clone())
    }

    /// Find one event through the listing its identifier points at.
    pub fn load_event(&self, event_id: &EventIdentifier) -> RegisterResult<Event> {
        let listing_id = event_id.listing_identifier()?;
        let listing = RegisterListing::load(&self.context(), &listing_id)?;
        listing
            .listing()
            .events
            .iter()
            .find(|event| event.event_id() == *event_id)
            .cloned()
            .ok_or_else(|| RegisterError::NoSuchResource(format!("event {event_id}")))
    }

    /// Events in listing order, with the count recorded in the manifest of
    /// the selected period.
    pub fn load_events(&self, selector: EventSelector) -> RegisterResult<(Vec<Event>, u64)> {
        let ctx = self.context();
        let mut events = Vec::new();
        let count = match selector {
            EventSelector::Day(date) => {
                let mut day = RegisterListingDay::load(&ctx, &date)?;
                collect_day(&ctx, &mut day, &mut events)?;
                day.integrity().manifest().number_of_events()
            }
            EventSelector::Month(month) => {
                let mut month = RegisterListingMonth::load(&ctx, &month)?;
                collect_month(&ctx, &mut month, &mut events)?;
                month.integrity().manifest().number_of_events()
            }
            EventSelector::Year(year) => {
                let mut year = RegisterListingYear::load(&ctx, &year)?;
                for month in year.member_names()? {
                    collect_month(&ctx, year.member(&ctx, &month)?, &mut events)?;
                }
                year.integrity().manifest().number_of_events()
            }
        };
        Ok((events, count))
    }

    /// Descriptor and content of a version's rendered artifact.
    pub fn load_render(&self, vid: &VersionedIdentifier) -> RegisterResult<(CanonicalFile, MemoizedReadable)> {
        let version = RegisterVersion::load(&self.context(), vid)?;
        match &version.record().render {
            Some(render) => Ok(content_of(render)),
            None => Err(RegisterError::NoSuchResource(format!("render of {vid}"))),
        }
    }

    /// Descriptor and content of a version's source package.
    pub fn load_source(&self, vid: &VersionedIdentifier) -> RegisterResult<(CanonicalFile, MemoizedReadable)> {
        let version = RegisterVersion::load(&self.context(), vid)?;
        Ok(content_of(&version.record().source))
    }

    /// Recompute the whole record from storage; returns every invalid key.
    pub fn verify(&self) -> RegisterResult<Vec<Key>> {
        let invalid = RegisterRoot::verify(&self.context())?;
        if invalid.is_empty() {
            info!("record verified");
        } else {
            warn!(invalid = invalid.len(), "record failed verification");
        }
        Ok(invalid)
    }
}

fn content_of(file: &RecordFile) -> (CanonicalFile, MemoizedReadable) {
    (file.to_domain(), file.stream.content.clone())
}

fn collect_day(ctx: &Context<'_>, day: &mut RegisterListingDay, events: &mut Vec<Event>) -> RegisterResult<()> {
    for id in day.member_names()? {
        events.extend(day.member(ctx, &id)?.listing().events.iter().cloned());
    }
    Ok(())
}

fn collect_month(ctx: &Context<'_>, month: &mut RegisterListingMonth, events: &mut Vec<Event>) -> RegisterResult<()> {
    for date in month.member_names()? {
        collect_day(ctx, month.member(ctx, &date)?, events)?;
    }
    Ok(())
}

impl std::fmt::Debug for RegisterApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterApi")
            .field("sources", &self.sources.len())
            .finish_non_exhaustive()
    }
}
