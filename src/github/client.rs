//! HTTP client for the commits endpoint.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use super::types::{ApiErrorBody, CommitResponse};
use crate::error::Error;
use crate::freshness::{CommitReference, CommitSource};

/// Public GitHub API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// Connection settings for [`GithubClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base: String,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            retries: 1,
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

/// Outcome of a single attempt that did not produce a timestamp.
#[derive(Debug)]
enum AttemptError {
    /// Worth another try (transport error, timeout, 429, 5xx).
    Transient(String),
    /// Retrying will not help (other 4xx, bad body).
    Permanent(String),
}

/// Reads commit metadata from a GitHub-compatible REST API.
pub struct GithubClient {
    api_base: Url,
    client: Client,
    retries: u32,
    retry_backoff: Duration,
}

impl GithubClient {
    /// Create a new client.
    pub fn new(options: ClientOptions) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;
        let api_base = Url::parse(options.api_base.trim()).map_err(|e| {
            Error::InvalidConfig(format!("invalid API base {:?}: {}", options.api_base, e))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "API base cannot carry a path: {}",
                api_base
            )));
        }

        Ok(Self {
            api_base,
            client,
            retries: options.retries,
            retry_backoff: options.retry_backoff,
        })
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_str()
    }

    /// URL of the latest-commit endpoint for a branch.
    ///
    /// Every path segment is percent-encoded. Slashes in the branch name
    /// stay path separators, so `feature/x` keeps working.
    pub fn commit_url(&self, reference: &CommitReference) -> Url {
        let mut url = self.api_base.clone();
        // Checked in new(): http(s) bases always accept path segments
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", &reference.owner, &reference.repo, "commits"])
                .extend(reference.branch.split('/'));
        }
        url
    }

    /// Fetch the author date of the branch's latest commit, retrying
    /// transient failures up to the configured number of times.
    pub async fn fetch_author_date(
        &self,
        reference: &CommitReference,
    ) -> Result<DateTime<FixedOffset>, Error> {
        let url = self.commit_url(reference);

        for attempt in 0..=self.retries {
            match self.attempt(url.clone()).await {
                Ok(date) => return Ok(date),
                Err(AttemptError::Permanent(reason)) => {
                    return Err(Error::fetch(reference, reason));
                }
                Err(AttemptError::Transient(reason)) => {
                    if attempt >= self.retries {
                        return Err(Error::fetch(reference, reason));
                    }

                    let wait = self.backoff(attempt);
                    warn!(
                        reference = %reference,
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "Fetch failed, retrying: {}",
                        reason
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        Err(Error::fetch(reference, "no attempts made"))
    }

    /// Exponential backoff: base * 2^attempt.
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// One GET request.
    async fn attempt(&self, url: Url) -> Result<DateTime<FixedOffset>, AttemptError> {
        debug!(url = %url, "Sending commit request");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_GITHUB_JSON)
            .header(API_VERSION_HEADER, API_VERSION)
            .header(USER_AGENT, concat!("freshcheck/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| AttemptError::Transient(describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(describe_transport_error(&e)))?;

        if !status.is_success() {
            let reason = describe_status(status, &body);
            return if is_retryable(status) {
                Err(AttemptError::Transient(reason))
            } else {
                Err(AttemptError::Permanent(reason))
            };
        }

        let commit: CommitResponse = serde_json::from_str(&body)
            .map_err(|e| AttemptError::Permanent(format!("malformed response body: {}", e)))?;

        debug!(sha = commit.sha.as_deref().unwrap_or("?"), "Decoded commit");
        commit.author_date().map_err(AttemptError::Permanent)
    }
}

impl CommitSource for GithubClient {
    async fn latest_commit_time(
        &self,
        reference: &CommitReference,
    ) -> Result<DateTime<FixedOffset>, Error> {
        self.fetch_author_date(reference).await
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn describe_status(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message);
    match message {
        Some(message) => format!("HTTP {}: {}", status.as_u16(), message),
        None => format!("HTTP {}", status.as_u16()),
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    }
}
