use canon_crypto::Checksum;
use canon_integrity::{IntegrityListing, ManifestEntry};
use canon_record::RecordListing;
use canon_types::{Event, Key, Listing, ListingIdentifier};
use tracing::info;

use crate::error::{RegisterError, RegisterResult};
use crate::node::{Context, RegisterNode};

/// One shard of one day's announcements.
///
/// Events are kept in the order they were added. Adding events rewrites the
/// whole entry.
#[derive(Clone, Debug)]
pub struct RegisterListing {
    integrity: IntegrityListing,
}

impl RegisterListing {
    pub fn identifier(&self) -> &ListingIdentifier {
        &self.integrity.record.domain.identifier
    }

    pub fn listing(&self) -> &Listing {
        &self.integrity.record.domain
    }

    fn store(ctx: &Context<'_>, listing: &Listing) -> RegisterResult<Self> {
        let record = RecordListing::from_domain(listing)?;
        let integrity = IntegrityListing::from_record(record)?;
        ctx.storage.store_entry(&integrity.entry)?;
        info!(
            listing = %listing.identifier,
            events = listing.number_of_events(),
            checksum = %integrity.checksum(),
            "listing stored"
        );
        Ok(Self { integrity })
    }

    /// `listing` with `events` appended; an event already listed is a
    /// consistency error.
    fn extended(mut listing: Listing, events: &[Event]) -> RegisterResult<Listing> {
        for event in events {
            let id = event.event_id();
            if listing.events.iter().any(|listed| listed.event_id() == id) {
                return Err(RegisterError::Consistency(format!(
                    "event {id} is already listed in {}",
                    listing.identifier
                )));
            }
            listing.events.push(event.clone());
        }
        Ok(listing)
    }
}

impl RegisterNode for RegisterListing {
    type Name = ListingIdentifier;

    fn create(ctx: &Context<'_>, name: &ListingIdentifier, events: &[Event]) -> RegisterResult<Self> {
        let listing = Self::extended(Listing::empty(name.clone()), events)?;
        Self::store(ctx, &listing)
    }

    fn load(ctx: &Context<'_>, name: &ListingIdentifier) -> RegisterResult<Self> {
        let key = RecordListing::make_key(name);
        let (stream, _) = ctx
            .storage
            .load_entry(&key)
            .map_err(|e| RegisterError::missing(e, format!("listing {name}")))?;
        let record = RecordListing::from_stream(key, stream)?;
        Ok(Self {
            integrity: IntegrityListing::from_record(record)?,
        })
    }

    fn add_events(&mut self, ctx: &Context<'_>, events: &[Event]) -> RegisterResult<()> {
        let listing = Self::extended(self.listing().clone(), events)?;
        *self = Self::store(ctx, &listing)?;
        Ok(())
    }

    fn checksum(&self) -> &Checksum {
        self.integrity.checksum()
    }

    fn manifest_entry(&self, name_in_parent: String) -> ManifestEntry {
        ManifestEntry {
            key: name_in_parent,
            ..self.integrity.manifest_entry()
        }
    }

    fn stored_key(name: &ListingIdentifier) -> Key {
        RecordListing::make_key(name)
    }

    fn verify(ctx: &Context<'_>, name: &ListingIdentifier, invalid: &mut Vec<Key>) -> RegisterResult<Option<Checksum>> {
        let key = RecordListing::make_key(name);
        match ctx.storage.load_entry(&key) {
            Ok((stream, checksum)) => {
                if RecordListing::from_stream(key.clone(), stream).is_err() {
                    invalid.push(key);
                }
                Ok(Some(checksum))
            }
            Err(e) if e.is_not_found() => {
                invalid.push(key);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
