use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use canon_register::RegisterApi;
use canon_source::{ContentSource, FilesystemSource, RemoteSource, RetryPolicy, UreqFetcher};
use canon_store::FilesystemStorage;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonConfig {
    /// Directory holding the record.
    pub storage_root: PathBuf,
    /// Local files under this directory may be referenced by events.
    pub filesystem_source_base: Option<PathBuf>,
    pub remote: Option<RemoteConfig>,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("record"),
            filesystem_source_base: None,
            remote: None,
        }
    }
}

/// A trusted mirror that events may reference over HTTP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub trusted_domain: String,
    pub trusted_scheme: String,
    pub retries: u32,
    pub backoff_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            trusted_domain: String::new(),
            trusted_scheme: "https".into(),
            retries: policy.retries,
            backoff_secs: policy.backoff.as_secs(),
            max_delay_secs: policy.max_delay.as_secs(),
        }
    }
}

impl CanonConfig {
    /// Read a config file, or the defaults if there is none.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).with_context(|| format!("parsing {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Sources for references carried by incoming events, local first.
    pub fn sources(&self) -> Vec<Arc<dyn ContentSource>> {
        let mut sources: Vec<Arc<dyn ContentSource>> = Vec::new();
        if let Some(base) = &self.filesystem_source_base {
            sources.push(Arc::new(FilesystemSource::new(base)));
        }
        if let Some(remote) = &self.remote {
            let policy = RetryPolicy {
                retries: remote.retries,
                backoff: Duration::from_secs(remote.backoff_secs),
                max_delay: Duration::from_secs(remote.max_delay_secs),
                ..RetryPolicy::default()
            };
            sources.push(Arc::new(RemoteSource::with_fetcher(
                remote.trusted_domain.as_str(),
                remote.trusted_scheme.as_str(),
                policy,
                Arc::new(UreqFetcher),
            )));
        }
        sources
    }

    pub fn storage(&self) -> FilesystemStorage {
        FilesystemStorage::new(&self.storage_root)
    }

    pub fn open(&self) -> anyhow::Result<RegisterApi> {
        RegisterApi::new(Arc::new(self.storage()), self.sources())
            .with_context(|| format!("opening record at {}", self.storage_root.display()))
    }
}
