use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identifier::VersionedIdentifier;
use crate::listing::{ListingIdentifier, DEFAULT_SHARD};
use crate::version::Version;

/// Kinds of change that can be applied to the record.
///
/// Serialized as short lowercase tags (`new`, `migrate_metadata`, ...), which
/// are also the keys of `number_of_events_by_type` in manifests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    New,
    Updated,
    Replaced,
    Cross,
    Withdrawn,
    Migrate,
    MigrateMetadata,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        Self::New,
        Self::Updated,
        Self::Replaced,
        Self::Cross,
        Self::Withdrawn,
        Self::Migrate,
        Self::MigrateMetadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
            Self::Replaced => "replaced",
            Self::Cross => "cross",
            Self::Withdrawn => "withdrawn",
            Self::Migrate => "migrate",
            Self::MigrateMetadata => "migrate_metadata",
        }
    }

    /// Events of this kind introduce a version that did not exist before.
    pub fn creates_version(&self) -> bool {
        matches!(self, Self::New | Self::Replaced | Self::Withdrawn)
    }
}

impl FromStr for EventType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TypeError::UnknownEventType(s.to_string()))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({})", self.as_str())
    }
}

/// Opaque, URL-safe identifier of an event.
///
/// Encodes `{versioned identifier}::{event date}::{shard}` so that the
/// listing holding the event can be located without an index.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventIdentifier(String);

impl EventIdentifier {
    pub fn from_parts(identifier: &VersionedIdentifier, event_date: &DateTime<Utc>, shard: &str) -> Self {
        let raw = format!("{identifier}::{}::{shard}", event_date_text(event_date));
        Self(URL_SAFE.encode(raw.as_bytes()))
    }

    /// Accept an already-encoded identifier, checking that it decodes.
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        let candidate = Self(value.to_string());
        candidate.decode()?;
        Ok(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the versioned identifier, event date, and shard.
    pub fn decode(&self) -> Result<(VersionedIdentifier, DateTime<Utc>, String), TypeError> {
        let invalid = || TypeError::InvalidEventIdentifier(self.0.clone());
        let bytes = URL_SAFE.decode(self.0.as_bytes()).map_err(|_| invalid())?;
        let raw = String::from_utf8(bytes).map_err(|_| invalid())?;
        let mut parts = raw.splitn(3, "::");
        let (Some(vid), Some(date), Some(shard)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let vid = VersionedIdentifier::parse(vid).map_err(|_| invalid())?;
        let date = DateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S%.f%:z")
            .or_else(|_| DateTime::parse_from_rfc3339(date))
            .map_err(|_| invalid())?
            .with_timezone(&Utc);
        Ok((vid, date, shard.to_string()))
    }

    /// The listing that holds the identified event.
    pub fn listing_identifier(&self) -> Result<ListingIdentifier, TypeError> {
        let (_, date, shard) = self.decode()?;
        ListingIdentifier::new(date.date_naive(), shard)
    }
}

/// `2019-01-02 20:00:00+00:00`, with `.ffffff` only when there are
/// microseconds. Stored event ids depend on this exact text.
fn event_date_text(date: &DateTime<Utc>) -> String {
    if date.nanosecond() / 1_000 == 0 {
        date.format("%Y-%m-%d %H:%M:%S+00:00").to_string()
    } else {
        date.format("%Y-%m-%d %H:%M:%S%.6f+00:00").to_string()
    }
}

impl fmt::Display for EventIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventIdentifier({})", self.0)
    }
}

/// A change to one version of an e-print.
///
/// Carries a full snapshot of the version as it should exist after the
/// event is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub identifier: VersionedIdentifier,
    pub event_date: DateTime<Utc>,
    pub event_type: EventType,
    pub version: Version,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_legacy: bool,
    #[serde(default)]
    pub event_agent: Option<String>,
}

impl Event {
    /// Listing shard this event is filed under.
    pub fn shard(&self) -> &'static str {
        DEFAULT_SHARD
    }

    pub fn event_id(&self) -> EventIdentifier {
        EventIdentifier::from_parts(&self.identifier, &self.event_date, self.shard())
    }

    pub fn listing_identifier(&self) -> ListingIdentifier {
        ListingIdentifier::from_date(self.event_date.date_naive())
    }

    pub fn summary(&self) -> EventSummary {
        EventSummary {
            identifier: self.identifier.clone(),
            event_date: self.event_date,
            event_type: self.event_type,
            event_id: self.event_id(),
            categories: self.categories.clone(),
            description: self.description.clone(),
            is_legacy: self.is_legacy,
            event_agent: self.event_agent.clone(),
        }
    }
}

/// Lightweight record of an event, kept in a version's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub identifier: VersionedIdentifier,
    pub event_date: DateTime<Utc>,
    pub event_type: EventType,
    pub event_id: EventIdentifier,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_legacy: bool,
    #[serde(default)]
    pub event_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_type_tags() {
        assert_eq!(EventType::MigrateMetadata.as_str(), "migrate_metadata");
        assert_eq!(
            serde_json::to_string(&EventType::MigrateMetadata).unwrap(),
            "\"migrate_metadata\""
        );
        for t in EventType::ALL {
            assert_eq!(t.as_str().parse::<EventType>().unwrap(), t);
        }
        assert!("update".parse::<EventType>().is_err());
    }

    #[test]
    fn creating_event_types() {
        assert!(EventType::New.creates_version());
        assert!(EventType::Replaced.creates_version());
        assert!(EventType::Withdrawn.creates_version());
        assert!(!EventType::Updated.creates_version());
        assert!(!EventType::Cross.creates_version());
    }

    #[test]
    fn event_identifier_decodes_to_parts() {
        let vid = VersionedIdentifier::parse("1901.00123v1").unwrap();
        let date = Utc.with_ymd_and_hms(2019, 1, 2, 20, 0, 0).unwrap();
        let eid = EventIdentifier::from_parts(&vid, &date, DEFAULT_SHARD);
        assert!(!eid.as_str().contains('/'));
        assert!(!eid.as_str().contains('+'));

        let (decoded_vid, decoded_date, shard) = eid.decode().unwrap();
        assert_eq!(decoded_vid, vid);
        assert_eq!(decoded_date, date);
        assert_eq!(shard, DEFAULT_SHARD);

        let listing = eid.listing_identifier().unwrap();
        assert_eq!(listing.to_string(), "2019-01-02::listing");
    }

    #[test]
    fn event_identifier_encodes_stored_date_text() {
        let vid = VersionedIdentifier::parse("1901.00123v1").unwrap();
        let date = Utc.with_ymd_and_hms(2019, 1, 2, 20, 0, 0).unwrap();
        let eid = EventIdentifier::from_parts(&vid, &date, "listing");
        let raw = URL_SAFE.decode(eid.as_str()).unwrap();
        assert_eq!(raw, b"1901.00123v1::2019-01-02 20:00:00+00:00::listing");

        let precise = date + chrono::Duration::microseconds(250);
        let eid = EventIdentifier::from_parts(&vid, &precise, "listing");
        let raw = URL_SAFE.decode(eid.as_str()).unwrap();
        assert_eq!(raw, b"1901.00123v1::2019-01-02 20:00:00.000250+00:00::listing");
        assert_eq!(eid.decode().unwrap().1, precise);
    }

    #[test]
    fn event_identifier_accepts_rfc3339_dates() {
        let raw = URL_SAFE.encode(b"1901.00123v1::2019-01-02T20:00:00+00:00::listing");
        let eid = EventIdentifier::parse(&raw).unwrap();
        assert_eq!(eid.decode().unwrap().1, Utc.with_ymd_and_hms(2019, 1, 2, 20, 0, 0).unwrap());
    }

    #[test]
    fn event_identifier_rejects_garbage() {
        assert!(EventIdentifier::parse("not base64!").is_err());
        let no_parts = URL_SAFE.encode(b"1901.00123v1");
        assert!(EventIdentifier::parse(&no_parts).is_err());
    }
}
