use canon_crypto::Checksum;
use canon_integrity::{IntegrityCollection, IntegrityError};
use canon_record::{Level, RootLevel, TopLevel};
use canon_types::{Event, Key};
use tracing::info;

use crate::error::{RegisterError, RegisterResult};
use crate::levels::{RegisterEPrints, RegisterListings};
use crate::node::{Context, RegisterNode};

/// The whole register: every e-print and every listing.
#[derive(Clone, Debug)]
pub struct RegisterRoot {
    integrity: IntegrityCollection<RootLevel>,
    eprints: RegisterEPrints,
    listings: RegisterListings,
}

impl RegisterRoot {
    /// Load the top of the tree. An empty store loads as an empty register.
    pub fn load(ctx: &Context<'_>) -> RegisterResult<Self> {
        let key = RootLevel::manifest_key(&());
        let integrity = match ctx.storage.load_manifest(&key) {
            Ok(manifest) => IntegrityCollection::from_manifest((), manifest)?,
            Err(e) if e.is_not_found() => IntegrityCollection::new(())?,
            Err(e) => return Err(e.into()),
        };
        let root = Self {
            eprints: RegisterEPrints::load(ctx, &())?,
            listings: RegisterListings::load(ctx, &())?,
            integrity,
        };
        root.check_member(TopLevel::EPrints, root.eprints.checksum())?;
        root.check_member(TopLevel::Listings, root.listings.checksum())?;
        Ok(root)
    }

    pub fn checksum(&self) -> &Checksum {
        self.integrity.checksum()
    }

    pub fn integrity(&self) -> &IntegrityCollection<RootLevel> {
        &self.integrity
    }

    pub fn eprints(&self) -> &RegisterEPrints {
        &self.eprints
    }

    pub fn listings(&self) -> &RegisterListings {
        &self.listings
    }

    /// Release everything below the two halves of the record.
    pub fn unload(&mut self) {
        self.eprints.unload();
        self.listings.unload();
    }

    /// Apply events to both halves of the record.
    ///
    /// Each event's summary is appended to the history of the version it
    /// carries before it is routed.
    pub fn add_events(&mut self, ctx: &Context<'_>, events: &[Event]) -> RegisterResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let mut routed = Vec::with_capacity(events.len());
        for event in events {
            if event.identifier != event.version.identifier {
                return Err(RegisterError::Consistency(format!(
                    "event for {} carries version {}",
                    event.identifier, event.version.identifier
                )));
            }
            let mut event = event.clone();
            let summary = event.summary();
            if !event.version.events.iter().any(|seen| seen.event_id == summary.event_id) {
                event.version.add_event_summary(summary);
            }
            routed.push(event);
        }

        self.eprints.add_events(ctx, &routed)?;
        self.listings.add_events(ctx, &routed)?;

        let eprints = self.eprints.manifest_entry(RootLevel::manifest_name(&TopLevel::EPrints));
        self.integrity.update_or_extend_manifest(eprints)?;
        let listings = self.listings.manifest_entry(RootLevel::manifest_name(&TopLevel::Listings));
        self.integrity.update_or_extend_manifest(listings)?;
        ctx.storage
            .store_manifest(&self.integrity.manifest_key(), self.integrity.manifest())?;

        info!(events = routed.len(), checksum = %self.checksum(), "events added to register");
        Ok(())
    }

    /// Recompute every checksum in storage from the leaves up.
    ///
    /// Returns the keys whose stored state does not match, sorted. A store
    /// holding nothing at all is valid.
    pub fn verify(ctx: &Context<'_>) -> RegisterResult<Vec<Key>> {
        let key = RootLevel::manifest_key(&());
        let mut invalid = Vec::new();
        let manifest = match ctx.storage.load_manifest(&key) {
            Ok(manifest) => Some(manifest),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };

        let eprints_key = RegisterEPrints::stored_key(&());
        let listings_key = RegisterListings::stored_key(&());
        let Some(manifest) = manifest else {
            if ctx.storage.exists(&eprints_key)? || ctx.storage.exists(&listings_key)? {
                invalid.push(key);
            }
            return Ok(invalid);
        };
        if !manifest.is_consistent() {
            invalid.push(key.clone());
        }

        let branches = [
            (TopLevel::EPrints, RegisterEPrints::verify(ctx, &(), &mut invalid)?, eprints_key),
            (TopLevel::Listings, RegisterListings::verify(ctx, &(), &mut invalid)?, listings_key),
        ];
        for (top, actual, branch_key) in branches {
            let recorded = manifest
                .entry(&RootLevel::manifest_name(&top))
                .and_then(|entry| entry.checksum.as_ref());
            if actual.is_none() || actual.as_ref() != recorded {
                if !invalid.contains(&branch_key) {
                    invalid.push(branch_key);
                }
                if !invalid.contains(&key) {
                    invalid.push(key.clone());
                }
            }
        }

        invalid.sort();
        invalid.dedup();
        Ok(invalid)
    }

    fn check_member(&self, top: TopLevel, actual: &Checksum) -> RegisterResult<()> {
        match self.integrity.member_checksum(&top) {
            Some(recorded) if recorded != actual => Err(IntegrityError::Validation {
                key: RootLevel::manifest_name(&top),
                expected: recorded.to_string(),
                actual: actual.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}
