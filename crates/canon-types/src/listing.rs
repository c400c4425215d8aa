use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::event::{Event, EventType};

/// Shard used when a day's listing is not subdivided.
pub const DEFAULT_SHARD: &str = "listing";

/// Identifies one shard of a day's announcement listing: `YYYY-MM-DD::{shard}`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListingIdentifier {
    date: NaiveDate,
    shard: String,
}

impl ListingIdentifier {
    /// Shard names may not contain colons, which delimit the two parts.
    pub fn new(date: NaiveDate, shard: impl Into<String>) -> Result<Self, TypeError> {
        let shard = shard.into();
        if shard.is_empty() || shard.contains(':') || shard.contains('/') {
            return Err(TypeError::InvalidListingIdentifier(format!("{date}::{shard}")));
        }
        Ok(Self { date, shard })
    }

    /// Identifier of the default shard for a day.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date,
            shard: DEFAULT_SHARD.to_string(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn shard(&self) -> &str {
        &self.shard
    }
}

impl FromStr for ListingIdentifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidListingIdentifier(s.to_string());
        let (date, shard) = s.split_once("::").ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
        Self::new(date, shard)
    }
}

impl TryFrom<String> for ListingIdentifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ListingIdentifier> for String {
    fn from(id: ListingIdentifier) -> Self {
        id.to_string()
    }
}

impl fmt::Display for ListingIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.date.format("%Y-%m-%d"), self.shard)
    }
}

impl fmt::Debug for ListingIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListingIdentifier({self})")
    }
}

/// The announcement events filed under one day-shard, in order of arrival.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub identifier: ListingIdentifier,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Listing {
    pub fn empty(identifier: ListingIdentifier) -> Self {
        Self {
            identifier,
            events: Vec::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.identifier.date()
    }

    pub fn number_of_events(&self) -> u64 {
        self.events.len() as u64
    }

    pub fn number_of_events_by_type(&self) -> BTreeMap<EventType, u64> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.event_type).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_identifier_parse_and_display() {
        let id: ListingIdentifier = "2019-01-02::listing".parse().unwrap();
        assert_eq!(id.date(), NaiveDate::from_ymd_opt(2019, 1, 2).unwrap());
        assert_eq!(id.shard(), "listing");
        assert_eq!(id.to_string(), "2019-01-02::listing");
        assert_eq!(ListingIdentifier::from_date(id.date()), id);
    }

    #[test]
    fn listing_identifier_rejects_colons() {
        let date = NaiveDate::from_ymd_opt(2019, 1, 2).unwrap();
        assert!(ListingIdentifier::new(date, "a:b").is_err());
        assert!(ListingIdentifier::new(date, "").is_err());
        assert!("2019-01-02".parse::<ListingIdentifier>().is_err());
        assert!("2019-02-30::listing".parse::<ListingIdentifier>().is_err());
    }

    #[test]
    fn empty_listing_has_no_counts() {
        let listing = Listing::empty(ListingIdentifier::from_date(
            NaiveDate::from_ymd_opt(2019, 1, 2).unwrap(),
        ));
        assert_eq!(listing.number_of_events(), 0);
        assert!(listing.number_of_events_by_type().is_empty());
    }
}
