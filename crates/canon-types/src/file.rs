use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Scheme of keys in the canonical record when rendered as URIs.
pub const CANONICAL_SCHEME: &str = "arxiv";

/// Kinds of bitstream stored in the record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Pdf,
    Targz,
    Json,
    Abs,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [Self::Pdf, Self::Targz, Self::Json, Self::Abs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Targz => "targz",
            Self::Json => "json",
            Self::Abs => "abs",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Targz => "application/gzip",
            Self::Json => "application/json",
            Self::Abs => "text/plain",
        }
    }

    /// File extension, without the leading dot.
    pub fn ext(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Targz => "tar.gz",
            Self::Json => "json",
            Self::Abs => "abs",
        }
    }

    pub fn from_mime_type(mime: &str) -> Result<Self, TypeError> {
        Self::ALL
            .into_iter()
            .find(|ct| ct.mime_type() == mime)
            .ok_or_else(|| TypeError::UnknownContentType(mime.to_string()))
    }
}

impl FromStr for ContentType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ct| ct.as_str() == s)
            .ok_or_else(|| TypeError::UnknownContentType(s.to_string()))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentType({})", self.as_str())
    }
}

/// A reference to bitstream content, inside or outside the canonical record.
///
/// Parsed as `scheme://netloc/path`. A bare absolute path is treated as a
/// local file, so `/tmp/a.pdf` becomes `file:///tmp/a.pdf`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uri {
    scheme: String,
    netloc: String,
    path: String,
}

impl Uri {
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        if let Some(path) = value.strip_prefix('/') {
            return Ok(Self {
                scheme: "file".into(),
                netloc: String::new(),
                path: format!("/{}", path.trim_start_matches('/')),
            });
        }
        let (scheme, rest) = value
            .split_once("://")
            .ok_or_else(|| TypeError::InvalidUri(value.to_string()))?;
        if scheme.is_empty()
            || !scheme
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
        {
            return Err(TypeError::InvalidUri(value.to_string()));
        }
        let (netloc, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            netloc: netloc.to_string(),
            path: path.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn netloc(&self) -> &str {
        &self.netloc
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The URI addresses a key in the canonical record.
    pub fn is_canonical(&self) -> bool {
        self.scheme == CANONICAL_SCHEME
    }

    pub fn is_file(&self) -> bool {
        self.scheme == "file"
    }

    pub fn is_http_url(&self) -> bool {
        self.scheme == "http" || self.scheme == "https"
    }
}

impl FromStr for Uri {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uri {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Uri> for String {
    fn from(uri: Uri) -> Self {
        uri.to_string()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.netloc, self.path)
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uri({self})")
    }
}

/// Address of one stored artifact in the canonical record.
///
/// Keys are slash-delimited paths relative to the record root, e.g.
/// `e-prints/2019/01/1901.00123/v1/1901.00123v1.json`. They are always
/// derived from identifiers and partitions, never chosen by callers.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Build a key, stripping an `arxiv:///` prefix and leading slashes.
    pub fn new(value: impl Into<String>) -> Self {
        let value: String = value.into();
        let prefix = format!("{CANONICAL_SCHEME}://");
        let path = value.strip_prefix(prefix.as_str()).unwrap_or(&value);
        Self(path.trim_start_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment.
    pub fn filename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Everything before the last path segment.
    pub fn parent(&self) -> &str {
        self.0.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }

    /// Render as an `arxiv:///` URI for use as a file reference.
    pub fn to_uri(&self) -> Uri {
        Uri {
            scheme: CANONICAL_SCHEME.into(),
            netloc: String::new(),
            path: format!("/{}", self.0),
        }
    }

    /// The key addressed by a canonical URI.
    pub fn from_uri(uri: &Uri) -> Option<Self> {
        uri.is_canonical().then(|| Self::new(uri.path()))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

/// Descriptor of one physical artifact, such as a source package or a PDF.
///
/// Equality ignores `reference` and `is_gzipped`: the same file may be
/// referenced from an external location before ingestion and from its
/// canonical key afterward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanonicalFile {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub size_bytes: u64,
    pub content_type: ContentType,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Uri,
    #[serde(default)]
    pub is_gzipped: bool,
}

impl CanonicalFile {
    pub fn mime_type(&self) -> &'static str {
        self.content_type.mime_type()
    }

    /// Same descriptor, pointing at a different location.
    pub fn with_reference(&self, reference: Uri) -> Self {
        Self {
            reference,
            ..self.clone()
        }
    }
}

impl PartialEq for CanonicalFile {
    fn eq(&self, other: &Self) -> bool {
        self.created == other.created
            && self.modified == other.modified
            && self.size_bytes == other.size_bytes
            && self.content_type == other.content_type
            && self.filename == other.filename
    }
}

impl Eq for CanonicalFile {}
