use derive_builder::Builder;
use reqwest::StatusCode;
use std::{fmt, time::Duration};

use crate::trace;

pub const DEFAULT_HOST: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = concat!("scaffold/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_ATTEMPTS: u32 = 1;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Identifies a zip archive of a repository at a given ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    owner: String,
    template_id: String,
    reference: String,
}

impl ArchiveRequest {
    #[must_use]
    pub fn new(
        owner: impl Into<String>,
        template_id: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            template_id: template_id.into(),
            reference: reference.into(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// `<host>/repos/<owner>/<template_id>/zipball/<reference>`
    #[must_use]
    pub fn url(&self, host: &str) -> String {
        format!(
            "{host}/repos/{owner}/{id}/zipball/{reference}",
            host = host.trim_end_matches('/'),
            owner = self.owner,
            id = self.template_id,
            reference = self.reference,
        )
    }
}

impl fmt::Display for ArchiveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.template_id, self.reference)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("archive not found at {url}")]
    NotFound { url: String },

    #[error("{url} answered with HTTP {status}")]
    RemoteError { url: String, status: u16 },

    #[error("failed to read archive body from {url}: {source}")]
    ReadFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::RemoteError { status, .. } => *status >= 500,
            FetchError::NotFound { .. } | FetchError::ReadFailed { .. } => false,
        }
    }
}

/// Downloads repository archives into memory.
///
/// A single attempt is made unless `attempts` is raised, in which case
/// network errors and 5xx answers are retried after `attempt * backoff`.
#[derive(Builder, Debug, Clone)]
pub struct Fetcher {
    #[builder(setter(into), default = "DEFAULT_HOST.to_string()")]
    host: String,
    #[builder(setter(into), default = "DEFAULT_USER_AGENT.to_string()")]
    user_agent: String,
    #[builder(default = "DEFAULT_TIMEOUT")]
    timeout: Duration,
    #[builder(default = "DEFAULT_ATTEMPTS")]
    attempts: u32,
    #[builder(default = "DEFAULT_BACKOFF")]
    backoff: Duration,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl Fetcher {
    /// Create a new [`Fetcher`] builder
    #[must_use]
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Download the archive described by `request`, returning the full body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] on a 404, [`FetchError::RemoteError`]
    /// for any other non-success status, [`FetchError::Network`] when the host
    /// can not be reached and [`FetchError::ReadFailed`] if the body is cut short.
    pub fn fetch(&self, request: &ArchiveRequest) -> Result<Vec<u8>, FetchError> {
        let url = request.url(&self.host);
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            trace!("GET {url} (attempt {attempt}/{attempts})");

            match self.fetch_once(&url) {
                Err(e) if attempt < attempts && e.is_transient() => {
                    trace!("Retrying after: {e}");
                    std::thread::sleep(self.backoff * attempt);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let network = |source| FetchError::Network {
            url: url.to_owned(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .build()
            .map_err(network)?;

        let response = client.get(url).send().map_err(network)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(FetchError::NotFound {
                    url: url.to_owned(),
                })
            }
            status => {
                return Err(FetchError::RemoteError {
                    url: url.to_owned(),
                    status: status.as_u16(),
                })
            }
        }

        let body = response.bytes().map_err(|source| FetchError::ReadFailed {
            url: url.to_owned(),
            source,
        })?;

        trace!("Downloaded {} bytes from {url}", body.len());

        Ok(body.to_vec())
    }
}
