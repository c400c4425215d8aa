use std::sync::Arc;
use std::time::Duration;

use canon_types::Uri;
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::readable::MemoizedReadable;
use crate::traits::ContentSource;

/// Largest response body accepted by [`UreqFetcher`].
const MAX_BODY_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// A completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Seconds to wait before asking again, from a `Refresh` header.
    pub refresh: Option<u64>,
    pub body: Vec<u8>,
}

/// Blocking HTTP GET used by [`RemoteSource`].
///
/// `Err` is reserved for transport failures (DNS, connect, reset). Any
/// response the server actually sent, whatever its status, is `Ok`.
pub trait HttpFetcher: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

/// [`HttpFetcher`] backed by `ureq`.
#[derive(Clone, Debug, Default)]
pub struct UreqFetcher;

impl HttpFetcher for UreqFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let mut response = match ureq::get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Ok(HttpResponse {
                    status,
                    refresh: None,
                    body: Vec::new(),
                })
            }
            Err(e) => return Err(format!("HTTP request failed: {e}")),
        };
        let status = response.status().as_u16();
        let refresh = response
            .headers()
            .get("refresh")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_refresh);
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| format!("failed to read response: {e}"))?;
        Ok(HttpResponse {
            status,
            refresh,
            body,
        })
    }
}

/// `Refresh: 5` or `Refresh: 5; url=...` yields 5.
fn parse_refresh(value: &str) -> Option<u64> {
    value.split(';').next()?.trim().parse().ok()
}

/// How a [`RemoteSource`] retries transient failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first.
    pub retries: u32,
    /// Delay before the first retry; doubled for each retry after that.
    pub backoff: Duration,
    /// Statuses treated as transient.
    pub retry_statuses: Vec<u16>,
    /// Upper bound on any single wait, including one a server asks for.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(retry)).min(self.max_delay)
    }

    /// Wait requested by a `Refresh` header, capped at `max_delay`.
    pub fn refresh_delay(&self, secs: u64) -> Duration {
        Duration::from_secs(secs).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_secs(2),
            retry_statuses: vec![500, 502, 503, 504],
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Resolves `http(s)` references on a single trusted domain.
///
/// A reference is claimed only when both its scheme and its netloc match
/// the trusted ones exactly.
#[derive(Clone)]
pub struct RemoteSource {
    trusted_domain: String,
    trusted_scheme: String,
    policy: RetryPolicy,
    fetcher: Arc<dyn HttpFetcher>,
}

impl RemoteSource {
    /// Trust `https://{trusted_domain}` with the default retry policy.
    pub fn new(trusted_domain: impl Into<String>) -> Self {
        Self::with_fetcher(trusted_domain, "https", RetryPolicy::default(), Arc::new(UreqFetcher))
    }

    pub fn with_fetcher(
        trusted_domain: impl Into<String>,
        trusted_scheme: impl Into<String>,
        policy: RetryPolicy,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Self {
        Self {
            trusted_domain: trusted_domain.into(),
            trusted_scheme: trusted_scheme.into(),
            policy,
            fetcher,
        }
    }

    pub fn trusted_domain(&self) -> &str {
        &self.trusted_domain
    }
}

impl std::fmt::Debug for RemoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSource")
            .field("trusted_domain", &self.trusted_domain)
            .field("trusted_scheme", &self.trusted_scheme)
            .field("policy", &self.policy)
            .finish()
    }
}

impl ContentSource for RemoteSource {
    fn name(&self) -> &str {
        "remote"
    }

    fn can_resolve(&self, uri: &Uri) -> bool {
        uri.is_http_url()
            && uri.netloc() == self.trusted_domain
            && uri.scheme() == self.trusted_scheme
    }

    fn load_deferred(&self, uri: &Uri) -> SourceResult<MemoizedReadable> {
        if !self.can_resolve(uri) {
            return Err(SourceError::Unresolvable(uri.to_string()));
        }
        let url = uri.to_string();
        let fetcher = self.fetcher.clone();
        let policy = self.policy.clone();
        Ok(MemoizedReadable::deferred(move || {
            fetch_with_retry(fetcher.as_ref(), &policy, &url)
        }))
    }
}

fn fetch_with_retry(fetcher: &dyn HttpFetcher, policy: &RetryPolicy, url: &str) -> SourceResult<Vec<u8>> {
    let attempts = policy.retries + 1;
    let mut last = String::new();
    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = policy.delay_for(attempt - 1);
            warn!(url, attempt, delay_ms = delay.as_millis() as u64, reason = %last, "retrying remote content");
            std::thread::sleep(delay);
        }
        match fetcher.get(url) {
            Ok(response) if response.status == 200 => {
                if let Some(secs) = response.refresh {
                    // Content is still being produced; ask again later.
                    last = format!("refresh requested after {secs}s");
                    std::thread::sleep(policy.refresh_delay(secs));
                    continue;
                }
                debug!(url, len = response.body.len(), "fetched remote content");
                return Ok(response.body);
            }
            Ok(response) if policy.retry_statuses.contains(&response.status) => {
                last = format!("HTTP {}", response.status);
            }
            Ok(response) => {
                return Err(SourceError::Http {
                    uri: url.to_string(),
                    status: response.status,
                })
            }
            Err(reason) => last = reason,
        }
    }
    Err(SourceError::RetriesExhausted {
        uri: url.to_string(),
        attempts,
        last,
    })
}
