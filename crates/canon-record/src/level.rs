use std::fmt;

use chrono::{Datelike, NaiveDate};

use canon_types::{Event, Identifier, Key, ListingIdentifier, VersionedIdentifier, YearMonth};

use crate::entry::RecordListing;
use crate::error::{RecordError, RecordResult};

/// One level of the record hierarchy.
///
/// Every function is pure: given only a partition name (or an event), it
/// derives keys and member names without touching storage.
pub trait Level: 'static {
    /// Partition name of a collection at this level.
    type Name: Clone + Ord + fmt::Debug + Send + Sync;

    /// Name of a member within a collection at this level.
    type MemberName: Clone + Ord + fmt::Debug + Send + Sync;

    /// Short label used in logs and errors.
    const LABEL: &'static str;

    /// Key of the manifest of the collection `name`.
    fn manifest_key(name: &Self::Name) -> Key;

    /// Key under which a member is filed in this level's manifest.
    fn manifest_name(member: &Self::MemberName) -> String;

    /// Inverse of [`manifest_name`](Self::manifest_name).
    fn parse_manifest_name(name: &Self::Name, entry: &str) -> RecordResult<Self::MemberName>;

    /// Members of this level that an event touches.
    fn members_for_event(event: &Event) -> Vec<Self::MemberName>;
}

fn unknown<L: Level>(name: &L::Name, entry: &str) -> RecordError {
    RecordError::UnknownMember {
        level: L::LABEL,
        parent: format!("{name:?}"),
        name: entry.to_string(),
    }
}

fn parse_iso_date(entry: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(entry, "%Y-%m-%d").ok()
}

/// Day on which an event's e-print was first announced.
fn eprint_day(event: &Event) -> NaiveDate {
    event.version.announced_date_first
}

/// Day under which an event is listed.
fn listing_day(event: &Event) -> NaiveDate {
    event.event_date.date_naive()
}

/// Versions of one e-print.
pub struct EPrintLevel;

impl Level for EPrintLevel {
    type Name = Identifier;
    type MemberName = VersionedIdentifier;
    const LABEL: &'static str = "eprint";

    fn manifest_key(name: &Identifier) -> Key {
        Key::new(format!(
            "e-prints/{}/{:02}/{}.manifest.json",
            name.year(),
            name.month(),
            name
        ))
    }

    fn manifest_name(member: &VersionedIdentifier) -> String {
        member.to_string()
    }

    fn parse_manifest_name(name: &Identifier, entry: &str) -> RecordResult<VersionedIdentifier> {
        match VersionedIdentifier::parse(entry) {
            Ok(vid) if vid.arxiv_id() == name => Ok(vid),
            _ => Err(unknown::<Self>(name, entry)),
        }
    }

    fn members_for_event(event: &Event) -> Vec<VersionedIdentifier> {
        vec![event.identifier.clone()]
    }
}

/// E-prints first announced on one day.
pub struct EPrintDayLevel;

impl Level for EPrintDayLevel {
    type Name = NaiveDate;
    type MemberName = Identifier;
    const LABEL: &'static str = "eprint-day";

    fn manifest_key(name: &NaiveDate) -> Key {
        Key::new(name.format("e-prints/%Y/%m/%Y-%m-%d.manifest.json").to_string())
    }

    fn manifest_name(member: &Identifier) -> String {
        member.to_string()
    }

    fn parse_manifest_name(name: &NaiveDate, entry: &str) -> RecordResult<Identifier> {
        Identifier::parse(entry).map_err(|_| unknown::<Self>(name, entry))
    }

    fn members_for_event(event: &Event) -> Vec<Identifier> {
        vec![event.identifier.arxiv_id().clone()]
    }
}

/// Announcement days within one month of e-prints.
pub struct EPrintMonthLevel;

impl Level for EPrintMonthLevel {
    type Name = YearMonth;
    type MemberName = NaiveDate;
    const LABEL: &'static str = "eprint-month";

    fn manifest_key(name: &YearMonth) -> Key {
        Key::new(format!("e-prints/{:04}/{}.manifest.json", name.year, name))
    }

    fn manifest_name(member: &NaiveDate) -> String {
        member.format("%Y-%m-%d").to_string()
    }

    fn parse_manifest_name(name: &YearMonth, entry: &str) -> RecordResult<NaiveDate> {
        parse_iso_date(entry)
            .filter(|date| YearMonth::from_date(*date) == *name)
            .ok_or_else(|| unknown::<Self>(name, entry))
    }

    fn members_for_event(event: &Event) -> Vec<NaiveDate> {
        vec![eprint_day(event)]
    }
}

/// Months within one year of e-prints.
pub struct EPrintYearLevel;

impl Level for EPrintYearLevel {
    type Name = i32;
    type MemberName = YearMonth;
    const LABEL: &'static str = "eprint-year";

    fn manifest_key(name: &i32) -> Key {
        Key::new(format!("e-prints/{name:04}.manifest.json"))
    }

    fn manifest_name(member: &YearMonth) -> String {
        member.to_string()
    }

    fn parse_manifest_name(name: &i32, entry: &str) -> RecordResult<YearMonth> {
        entry
            .parse::<YearMonth>()
            .ok()
            .filter(|ym| ym.year == *name)
            .ok_or_else(|| unknown::<Self>(name, entry))
    }

    fn members_for_event(event: &Event) -> Vec<YearMonth> {
        vec![YearMonth::from_date(eprint_day(event))]
    }
}

/// Every year of e-prints.
pub struct AllEPrintsLevel;

impl Level for AllEPrintsLevel {
    type Name = ();
    type MemberName = i32;
    const LABEL: &'static str = "eprints";

    fn manifest_key(_: &()) -> Key {
        Key::new("e-prints.manifest.json")
    }

    fn manifest_name(member: &i32) -> String {
        format!("{member:04}")
    }

    fn parse_manifest_name(name: &(), entry: &str) -> RecordResult<i32> {
        entry.parse().map_err(|_| unknown::<Self>(name, entry))
    }

    fn members_for_event(event: &Event) -> Vec<i32> {
        vec![eprint_day(event).year()]
    }
}

/// Listing shards of one announcement day.
pub struct ListingDayLevel;

impl Level for ListingDayLevel {
    type Name = NaiveDate;
    type MemberName = ListingIdentifier;
    const LABEL: &'static str = "listing-day";

    fn manifest_key(name: &NaiveDate) -> Key {
        Key::new(name.format("announcement/%Y/%m/%Y-%m-%d.manifest.json").to_string())
    }

    fn manifest_name(member: &ListingIdentifier) -> String {
        RecordListing::make_key(member).to_string()
    }

    fn parse_manifest_name(name: &NaiveDate, entry: &str) -> RecordResult<ListingIdentifier> {
        let prefix = name.format("announcement/%Y/%m/%d/%Y-%m-%d-").to_string();
        entry
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_suffix(".json"))
            .and_then(|shard| ListingIdentifier::new(*name, shard).ok())
            .ok_or_else(|| unknown::<Self>(name, entry))
    }

    fn members_for_event(event: &Event) -> Vec<ListingIdentifier> {
        vec![event.listing_identifier()]
    }
}

/// Listing days within one month.
pub struct ListingMonthLevel;

impl Level for ListingMonthLevel {
    type Name = YearMonth;
    type MemberName = NaiveDate;
    const LABEL: &'static str = "listing-month";

    fn manifest_key(name: &YearMonth) -> Key {
        Key::new(format!("announcement/{:04}/{}.manifest.json", name.year, name))
    }

    fn manifest_name(member: &NaiveDate) -> String {
        member.format("%Y-%m-%d").to_string()
    }

    fn parse_manifest_name(name: &YearMonth, entry: &str) -> RecordResult<NaiveDate> {
        parse_iso_date(entry)
            .filter(|date| YearMonth::from_date(*date) == *name)
            .ok_or_else(|| unknown::<Self>(name, entry))
    }

    fn members_for_event(event: &Event) -> Vec<NaiveDate> {
        vec![listing_day(event)]
    }
}

/// Listing months within one year.
pub struct ListingYearLevel;

impl Level for ListingYearLevel {
    type Name = i32;
    type MemberName = YearMonth;
    const LABEL: &'static str = "listing-year";

    fn manifest_key(name: &i32) -> Key {
        Key::new(format!("announcement/{name:04}.manifest.json"))
    }

    fn manifest_name(member: &YearMonth) -> String {
        member.to_string()
    }

    fn parse_manifest_name(name: &i32, entry: &str) -> RecordResult<YearMonth> {
        entry
            .parse::<YearMonth>()
            .ok()
            .filter(|ym| ym.year == *name)
            .ok_or_else(|| unknown::<Self>(name, entry))
    }

    fn members_for_event(event: &Event) -> Vec<YearMonth> {
        vec![YearMonth::from_date(listing_day(event))]
    }
}

/// Every year of listings.
pub struct AllListingsLevel;

impl Level for AllListingsLevel {
    type Name = ();
    type MemberName = i32;
    const LABEL: &'static str = "listings";

    fn manifest_key(_: &()) -> Key {
        Key::new("announcement.manifest.json")
    }

    fn manifest_name(member: &i32) -> String {
        format!("{member:04}")
    }

    fn parse_manifest_name(name: &(), entry: &str) -> RecordResult<i32> {
        entry.parse().map_err(|_| unknown::<Self>(name, entry))
    }

    fn members_for_event(event: &Event) -> Vec<i32> {
        vec![listing_day(event).year()]
    }
}

/// The two halves of the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TopLevel {
    EPrints,
    Listings,
}

impl TopLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EPrints => "eprints",
            Self::Listings => "listings",
        }
    }
}

/// The whole record.
pub struct RootLevel;

impl Level for RootLevel {
    type Name = ();
    type MemberName = TopLevel;
    const LABEL: &'static str = "global";

    fn manifest_key(_: &()) -> Key {
        Key::new("global.manifest.json")
    }

    fn manifest_name(member: &TopLevel) -> String {
        member.as_str().to_string()
    }

    fn parse_manifest_name(name: &(), entry: &str) -> RecordResult<TopLevel> {
        match entry {
            "eprints" => Ok(TopLevel::EPrints),
            "listings" => Ok(TopLevel::Listings),
            _ => Err(unknown::<Self>(name, entry)),
        }
    }

    fn members_for_event(_: &Event) -> Vec<TopLevel> {
        vec![TopLevel::EPrints, TopLevel::Listings]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn eprint_manifest_keys() {
        let id = Identifier::parse("1901.00123").unwrap();
        assert_eq!(
            EPrintLevel::manifest_key(&id).as_str(),
            "e-prints/2019/01/1901.00123.manifest.json"
        );
        assert_eq!(
            EPrintDayLevel::manifest_key(&date(2019, 1, 2)).as_str(),
            "e-prints/2019/01/2019-01-02.manifest.json"
        );
        assert_eq!(
            EPrintMonthLevel::manifest_key(&YearMonth::new(2019, 1)).as_str(),
            "e-prints/2019/2019-01.manifest.json"
        );
        assert_eq!(EPrintYearLevel::manifest_key(&2019).as_str(), "e-prints/2019.manifest.json");
        assert_eq!(AllEPrintsLevel::manifest_key(&()).as_str(), "e-prints.manifest.json");
    }

    #[test]
    fn listing_manifest_keys() {
        assert_eq!(
            ListingDayLevel::manifest_key(&date(2019, 1, 2)).as_str(),
            "announcement/2019/01/2019-01-02.manifest.json"
        );
        assert_eq!(
            ListingMonthLevel::manifest_key(&YearMonth::new(2019, 1)).as_str(),
            "announcement/2019/2019-01.manifest.json"
        );
        assert_eq!(ListingYearLevel::manifest_key(&2019).as_str(), "announcement/2019.manifest.json");
        assert_eq!(AllListingsLevel::manifest_key(&()).as_str(), "announcement.manifest.json");
        assert_eq!(RootLevel::manifest_key(&()).as_str(), "global.manifest.json");
    }

    #[test]
    fn old_style_eprint_manifest_key() {
        let id = Identifier::parse("hep-th/9901001").unwrap();
        assert_eq!(
            EPrintLevel::manifest_key(&id).as_str(),
            "e-prints/1999/01/hep-th/9901001.manifest.json"
        );
    }

    #[test]
    fn manifest_names_parse_back() {
        let day = date(2019, 1, 2);
        let listing = ListingIdentifier::new(day, "foo").unwrap();
        let name = ListingDayLevel::manifest_name(&listing);
        assert_eq!(name, "announcement/2019/01/02/2019-01-02-foo.json");
        assert_eq!(ListingDayLevel::parse_manifest_name(&day, &name).unwrap(), listing);

        let ym = YearMonth::new(2019, 1);
        assert_eq!(EPrintMonthLevel::parse_manifest_name(&ym, "2019-01-02").unwrap(), day);
        assert_eq!(EPrintYearLevel::parse_manifest_name(&2019, "2019-01").unwrap(), ym);
        assert_eq!(AllListingsLevel::parse_manifest_name(&(), "2019").unwrap(), 2019);
        assert_eq!(RootLevel::parse_manifest_name(&(), "listings").unwrap(), TopLevel::Listings);
    }

    #[test]
    fn manifest_names_outside_partition_are_rejected() {
        let ym = YearMonth::new(2019, 1);
        assert!(EPrintMonthLevel::parse_manifest_name(&ym, "2019-02-01").is_err());
        assert!(EPrintYearLevel::parse_manifest_name(&2019, "2018-12").is_err());
        let id = Identifier::parse("1901.00123").unwrap();
        assert!(EPrintLevel::parse_manifest_name(&id, "1901.00124v1").is_err());
        assert!(RootLevel::parse_manifest_name(&(), "other").is_err());
    }
}
