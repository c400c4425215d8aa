use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// An e-print identifier.
///
/// Two forms are accepted:
/// - new-style `YYMM.NNNNN` (four or five digit incremental part)
/// - old-style `archive(.SC)/YYMMNNN`, e.g. `hep-th/9901001` or `math.AG/0101001`
///
/// The year and month of first submission are embedded in the identifier, so
/// the storage partition of a document is derivable from its identifier alone.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Parse and validate an identifier.
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        if is_new_style(value) || is_old_style(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(TypeError::InvalidIdentifier(value.to_string()))
        }
    }

    /// Build a new-style identifier from its parts.
    pub fn from_parts(year: i32, month: u32, incremental: u32) -> Result<Self, TypeError> {
        Self::parse(&format!("{:02}{:02}.{:05}", year.rem_euclid(100), month, incremental))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for `archive/YYMMNNN` identifiers.
    pub fn is_old_style(&self) -> bool {
        self.0.contains('/')
    }

    /// The `YYMMNNN` or `YYMM.NNNNN` part of the identifier.
    pub fn numeric_part(&self) -> &str {
        match self.0.split_once('/') {
            Some((_, numeric)) => numeric,
            None => &self.0,
        }
    }

    /// The archive (and subject class) of an old-style identifier.
    pub fn category_part(&self) -> Option<&str> {
        self.0.split_once('/').map(|(category, _)| category)
    }

    /// The incrementing part of the identifier.
    pub fn incremental_part(&self) -> u32 {
        let numeric = self.numeric_part();
        let tail = if self.is_old_style() {
            &numeric[4..]
        } else {
            &numeric[5..]
        };
        tail.parse().unwrap_or_default()
    }

    /// Four-digit year of first submission. Two-digit years above 90 are 19xx.
    pub fn year(&self) -> i32 {
        let yy: i32 = self.numeric_part()[0..2].parse().unwrap_or_default();
        if yy > 90 {
            1900 + yy
        } else {
            2000 + yy
        }
    }

    /// Month of first submission.
    pub fn month(&self) -> u32 {
        self.numeric_part()[2..4].parse().unwrap_or_default()
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::new(self.year(), self.month())
    }
}

fn valid_yymm(digits: &str) -> bool {
    matches!(digits[2..4].parse::<u32>(), Ok(1..=12))
}

fn is_new_style(value: &str) -> bool {
    let Some((yymm, inc)) = value.split_once('.') else {
        return false;
    };
    yymm.len() == 4
        && yymm.bytes().all(|b| b.is_ascii_digit())
        && (inc.len() == 4 || inc.len() == 5)
        && inc.bytes().all(|b| b.is_ascii_digit())
        && valid_yymm(yymm)
}

fn is_old_style(value: &str) -> bool {
    let Some((category, numeric)) = value.split_once('/') else {
        return false;
    };
    let (archive, subject) = match category.split_once('.') {
        Some((archive, subject)) => (archive, Some(subject)),
        None => (category, None),
    };
    let archive_ok = !archive.is_empty()
        && archive.bytes().all(|b| b.is_ascii_lowercase() || b == b'-');
    let subject_ok = subject
        .map(|s| s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase()))
        .unwrap_or(true);
    archive_ok
        && subject_ok
        && numeric.len() == 7
        && numeric.bytes().all(|b| b.is_ascii_digit())
        && valid_yymm(numeric)
}

impl FromStr for Identifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

/// One version of an e-print, rendered as `{identifier}v{version}`.
///
/// Ordering is by identifier, then by numeric version, so `v10` sorts after `v9`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionedIdentifier {
    arxiv_id: Identifier,
    version: u32,
}

impl VersionedIdentifier {
    pub fn new(arxiv_id: Identifier, version: u32) -> Result<Self, TypeError> {
        if version == 0 {
            return Err(TypeError::InvalidVersionedIdentifier(format!("{arxiv_id}v0")));
        }
        Ok(Self { arxiv_id, version })
    }

    pub fn parse(value: &str) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidVersionedIdentifier(value.to_string());
        let split = value.rfind('v').ok_or_else(invalid)?;
        let arxiv_id = Identifier::parse(&value[..split]).map_err(|_| invalid())?;
        let version: u32 = value[split + 1..].parse().map_err(|_| invalid())?;
        Self::new(arxiv_id, version).map_err(|_| invalid())
    }

    pub fn arxiv_id(&self) -> &Identifier {
        &self.arxiv_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn year(&self) -> i32 {
        self.arxiv_id.year()
    }

    pub fn month(&self) -> u32 {
        self.arxiv_id.month()
    }
}

impl FromStr for VersionedIdentifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionedIdentifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionedIdentifier> for String {
    fn from(vid: VersionedIdentifier) -> Self {
        vid.to_string()
    }
}

impl fmt::Display for VersionedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.arxiv_id, self.version)
    }
}

impl fmt::Debug for VersionedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionedIdentifier({self})")
    }
}

/// A month partition of the record, rendered as `YYYY-MM`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub const fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }
}

impl FromStr for YearMonth {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidYearMonth(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self::new(year, month))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(ym: YearMonth) -> Self {
        ym.to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Debug for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "YearMonth({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_style_identifier_parts() {
        let id = Identifier::parse("1901.00123").unwrap();
        assert!(!id.is_old_style());
        assert_eq!(id.year(), 2019);
        assert_eq!(id.month(), 1);
        assert_eq!(id.incremental_part(), 123);
        assert_eq!(id.category_part(), None);
        assert_eq!(id.numeric_part(), "1901.00123");
    }

    #[test]
    fn old_style_identifier_parts() {
        let id = Identifier::parse("hep-th/9901001").unwrap();
        assert!(id.is_old_style());
        assert_eq!(id.year(), 1999);
        assert_eq!(id.month(), 1);
        assert_eq!(id.category_part(), Some("hep-th"));
        assert_eq!(id.numeric_part(), "9901001");
        assert_eq!(id.incremental_part(), 1);

        let with_subject = Identifier::parse("math.AG/0101001").unwrap();
        assert_eq!(with_subject.year(), 2001);
        assert_eq!(with_subject.category_part(), Some("math.AG"));
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for bad in ["", "1913.00001", "19010.0001", "hep-th/99010", "HEP/9901001", "1901.001"] {
            assert!(Identifier::parse(bad).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn from_parts_pads_fields() {
        let id = Identifier::from_parts(2019, 3, 7).unwrap();
        assert_eq!(id.as_str(), "1903.00007");
    }

    #[test]
    fn versioned_identifier_parse() {
        let vid = VersionedIdentifier::parse("1901.00123v2").unwrap();
        assert_eq!(vid.arxiv_id().as_str(), "1901.00123");
        assert_eq!(vid.version(), 2);
        assert_eq!(vid.to_string(), "1901.00123v2");

        // Archive names may themselves contain a `v`.
        let old = VersionedIdentifier::parse("solv-int/9901001v3").unwrap();
        assert_eq!(old.arxiv_id().as_str(), "solv-int/9901001");
        assert_eq!(old.version(), 3);
    }

    #[test]
    fn versioned_identifier_rejects_zero_and_garbage() {
        assert!(VersionedIdentifier::parse("1901.00123v0").is_err());
        assert!(VersionedIdentifier::parse("1901.00123").is_err());
        assert!(VersionedIdentifier::parse("1901.00123vx").is_err());
    }

    #[test]
    fn versions_order_numerically() {
        let v9 = VersionedIdentifier::parse("1901.00123v9").unwrap();
        let v10 = VersionedIdentifier::parse("1901.00123v10").unwrap();
        assert!(v9 < v10);
    }

    #[test]
    fn year_month_display_and_parse() {
        let ym: YearMonth = "2019-03".parse().unwrap();
        assert_eq!(ym, YearMonth::new(2019, 3));
        assert_eq!(ym.to_string(), "2019-03");
        assert!("2019-13".parse::<YearMonth>().is_err());
    }

    #[test]
    fn identifiers_serialize_as_strings() {
        let vid = VersionedIdentifier::parse("1901.00123v1").unwrap();
        let json = serde_json::to_string(&vid).unwrap();
        assert_eq!(json, "\"1901.00123v1\"");
        let back: VersionedIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vid);
    }

    proptest! {
        #[test]
        fn new_style_partition_matches_prefix(yy in 0u32..100, mm in 1u32..=12, inc in 0u32..100_000) {
            let raw = format!("{yy:02}{mm:02}.{inc:05}");
            let id = Identifier::parse(&raw).unwrap();
            prop_assert_eq!(id.month(), mm);
            prop_assert_eq!(id.year() % 100, yy as i32);
            prop_assert_eq!(id.incremental_part(), inc);
        }
    }
}
