//! Commits API response types.
//!
//! Only the fields freshcheck reads are modelled. Everything is optional so
//! that a partial body decodes and the missing field can be reported by name.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// `GET /repos/{owner}/{repo}/commits/{ref}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitResponse {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub commit: Option<CommitDetail>,
}

/// The git-level commit object.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<GitSignature>,
    #[serde(default)]
    pub committer: Option<GitSignature>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Author or committer signature.
#[derive(Debug, Clone, Deserialize)]
pub struct GitSignature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl CommitResponse {
    /// Parse `commit.author.date`.
    pub fn author_date(&self) -> Result<DateTime<FixedOffset>, String> {
        let raw = self
            .commit
            .as_ref()
            .and_then(|c| c.author.as_ref())
            .and_then(|a| a.date.as_deref())
            .ok_or_else(|| "response has no commit.author.date".to_string())?;

        DateTime::parse_from_rfc3339(raw)
            .map_err(|e| format!("invalid commit.author.date {:?}: {}", raw, e))
    }
}
