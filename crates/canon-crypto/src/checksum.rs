use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{ChecksumError, ChecksumResult};

const DIGEST_LEN: usize = 16;
const READ_CHUNK: usize = 64 * 1024;

/// URL-safe base64 encoding of an MD5 digest.
///
/// Transmitted and stored as a plain string, e.g. `XUFAKrxLKna5cZ2REBfFkg==`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum(String);

impl Checksum {
    /// Checksum of raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = StreamHasher::new();
        hasher.update(data);
        hasher.finish()
    }

    /// Parse a stored checksum, checking that it decodes to a digest.
    pub fn parse(value: &str) -> ChecksumResult<Self> {
        let decoded = URL_SAFE
            .decode(value.as_bytes())
            .map_err(|_| ChecksumError::Malformed(value.to_string()))?;
        if decoded.len() != DIGEST_LEN {
            return Err(ChecksumError::Malformed(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that data produces this checksum.
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::of_bytes(data) == *self
    }
}

impl TryFrom<String> for Checksum {
    type Error = ChecksumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Checksum> for String {
    fn from(checksum: Checksum) -> Self {
        checksum.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.0)
    }
}

/// Incremental MD5 hasher producing a [`Checksum`].
#[derive(Clone, Default)]
pub struct StreamHasher {
    inner: Md5,
}

impl StreamHasher {
    pub fn new() -> Self {
        Self { inner: Md5::new() }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finish(self) -> Checksum {
        Checksum(URL_SAFE.encode(self.inner.finalize()))
    }
}

/// Checksum the full content of a seekable stream.
///
/// Hashing always starts at offset zero. The stream position is restored
/// afterward so the stream stays usable by other readers.
pub fn checksum_reader<R: Read + Seek>(reader: &mut R) -> ChecksumResult<Checksum> {
    let position = reader.stream_position()?;
    reader.seek(SeekFrom::Start(0))?;
    let mut hasher = StreamHasher::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    reader.seek(SeekFrom::Start(position))?;
    Ok(hasher.finish())
}

/// Checksum of a collection from its members' `(key, checksum)` pairs.
///
/// Members are sorted by key before their checksums are concatenated, so the
/// result does not depend on iteration order.
pub fn checksum_collection<'a, I>(members: I) -> Checksum
where
    I: IntoIterator<Item = (&'a str, &'a Checksum)>,
{
    let mut members: Vec<(&str, &Checksum)> = members.into_iter().collect();
    members.sort_by(|a, b| a.0.cmp(b.0));
    let mut hasher = StreamHasher::new();
    for (_, checksum) in members {
        hasher.update(checksum.as_str().as_bytes());
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn known_digest_of_empty_input() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(Checksum::of_bytes(b"").as_str(), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[test]
    fn encoding_is_url_safe_with_padding() {
        for data in [&b"hello world"[..], b"\xff\xfe\xfd", b"canonical record"] {
            let checksum = Checksum::of_bytes(data);
            assert_eq!(checksum.as_str().len(), 24);
            assert!(checksum.as_str().ends_with("=="));
            assert!(!checksum.as_str().contains('+'));
            assert!(!checksum.as_str().contains('/'));
        }
    }

    #[test]
    fn verify_detects_tampering() {
        let checksum = Checksum::of_bytes(b"original");
        assert!(checksum.verify(b"original"));
        assert!(!checksum.verify(b"tampered"));
    }

    #[test]
    fn parse_rejects_non_digests() {
        assert!(Checksum::parse("not a checksum").is_err());
        assert!(Checksum::parse("AAAA").is_err());
        let good = Checksum::of_bytes(b"x");
        assert_eq!(Checksum::parse(good.as_str()).unwrap(), good);
    }

    #[test]
    fn reader_checksum_restores_position() {
        let data = b"0123456789abcdef".to_vec();
        let mut cursor = Cursor::new(data.clone());
        cursor.seek(SeekFrom::Start(5)).unwrap();
        let checksum = checksum_reader(&mut cursor).unwrap();
        assert_eq!(checksum, Checksum::of_bytes(&data));
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn collection_checksum_is_digest_of_sorted_concatenation() {
        let a = Checksum::of_bytes(b"a");
        let b = Checksum::of_bytes(b"b");
        let expected = Checksum::of_bytes(format!("{a}{b}").as_bytes());
        assert_eq!(checksum_collection([("2", &b), ("1", &a)]), expected);
    }

    #[test]
    fn serde_uses_plain_string() {
        let checksum = Checksum::of_bytes(b"abc");
        let json = serde_json::to_string(&checksum).unwrap();
        assert_eq!(json, format!("\"{checksum}\""));
        let back: Checksum = serde_json::from_str(&json).unwrap();
        assert_eq!(back, checksum);
        assert!(serde_json::from_str::<Checksum>("\"bogus\"").is_err());
    }

    proptest! {
        #[test]
        fn leaf_checksum_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(Checksum::of_bytes(&data), Checksum::of_bytes(&data));
        }

        #[test]
        fn collection_checksum_ignores_member_order(
            contents in proptest::collection::btree_map("[a-z0-9/.-]{1,16}", proptest::collection::vec(any::<u8>(), 0..32), 1..12),
            rotate in 0usize..12,
        ) {
            let members: Vec<(String, Checksum)> = contents
                .iter()
                .map(|(k, v)| (k.clone(), Checksum::of_bytes(v)))
                .collect();
            let sorted = checksum_collection(members.iter().map(|(k, c)| (k.as_str(), c)));

            let mut shuffled = members.clone();
            shuffled.reverse();
            let len = shuffled.len();
            shuffled.rotate_left(rotate % len);
            let permuted = checksum_collection(shuffled.iter().map(|(k, c)| (k.as_str(), c)));
            prop_assert_eq!(sorted, permuted);
        }
    }
}
