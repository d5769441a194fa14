//! Reporting a freshness result to the calling pipeline.
//!
//! The value always goes to stdout. Depending on the exit-status policy it is
//! also carried in the process exit status, and it can be appended to a
//! step-output file in `key=value` form.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Error;
use crate::freshness::FreshnessReport;

/// Exit status reserved for failures under the `freshness` policy.
pub const FAILURE_STATUS: u8 = 255;

/// Largest value the `freshness` policy can carry in the exit status.
pub const MAX_FRESHNESS_STATUS: u8 = 254;

/// Environment variable naming the GitHub Actions step-output file.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Bare integer on stdout
    #[default]
    Text,
    /// Full report as JSON on stdout
    Json,
}

/// What the process exit status means.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatusPolicy {
    /// Exit status is the freshness value (clamped to 254), 255 on failure
    #[default]
    Freshness,
    /// Exit 0 on success, 1 on fetch failure, 2 on configuration failure
    Success,
}

impl ExitStatusPolicy {
    /// Exit status for a successful check.
    pub fn status_for_value(self, value: u64) -> u8 {
        match self {
            Self::Freshness => {
                if value > u64::from(MAX_FRESHNESS_STATUS) {
                    warn!(
                        value,
                        max = MAX_FRESHNESS_STATUS,
                        "Freshness value exceeds exit status range, clamping"
                    );
                    MAX_FRESHNESS_STATUS
                } else {
                    value as u8
                }
            }
            Self::Success => 0,
        }
    }

    /// Exit status for a failed check. Never a valid freshness value.
    pub fn status_for_error(self, error: &Error) -> u8 {
        match self {
            Self::Freshness => FAILURE_STATUS,
            Self::Success => {
                if error.is_configuration() {
                    2
                } else {
                    1
                }
            }
        }
    }
}

/// Render the report for stdout.
pub fn render(report: &FreshnessReport, format: OutputFormat) -> Result<String, Error> {
    match format {
        OutputFormat::Text => Ok(report.value.to_string()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

/// Pick the step-output file: an explicit path wins, otherwise
/// `$GITHUB_OUTPUT` when enabled and non-empty.
pub fn resolve_output_file(
    explicit: Option<PathBuf>,
    use_github_output: bool,
    github_output: Option<OsString>,
) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    if !use_github_output {
        return None;
    }
    github_output
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Whether a value is over the caller's maximum age.
pub fn is_stale(value: u64, max_age: u64) -> bool {
    value > max_age
}

/// Append `freshness=<value>` (and `stale=<bool>` when a maximum age is
/// given) to a step-output file.
pub fn append_output_file(path: &Path, value: u64, max_age: Option<u64>) -> Result<(), Error> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    writeln!(file, "freshness={}", value)?;
    if let Some(max_age) = max_age {
        writeln!(file, "stale={}", is_stale(value, max_age))?;
    }

    tracing::debug!(path = %path.display(), "Wrote step output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::{Aggregation, BranchFreshness, CommitReference};
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn report(value: u64) -> FreshnessReport {
        let committed_at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        FreshnessReport {
            checked_at: DateTime::parse_from_rfc3339("2024-01-04T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            unit_seconds: 86_400,
            aggregation: Aggregation::Single,
            branches: vec![BranchFreshness {
                reference: CommitReference::new("electricgoat", "ba-data", "jp").unwrap(),
                committed_at,
                elapsed_units: value,
            }],
            value,
        }
    }

    #[test]
    fn test_freshness_status() {
        let policy = ExitStatusPolicy::Freshness;
        assert_eq!(policy.status_for_value(0), 0);
        assert_eq!(policy.status_for_value(3), 3);
        assert_eq!(policy.status_for_value(254), 254);
        assert_eq!(policy.status_for_value(255), 254);
        assert_eq!(policy.status_for_value(10_000), 254);
    }

    #[test]
    fn test_failure_status_is_reserved() {
        let policy = ExitStatusPolicy::Freshness;
        let fetch = Error::fetch("a/b@main", "HTTP 500");
        let config = Error::MissingConfig("source.owner");
        assert_eq!(policy.status_for_error(&fetch), FAILURE_STATUS);
        assert_eq!(policy.status_for_error(&config), FAILURE_STATUS);
        assert!(FAILURE_STATUS > MAX_FRESHNESS_STATUS);
    }

    #[test]
    fn test_success_policy() {
        let policy = ExitStatusPolicy::Success;
        assert_eq!(policy.status_for_value(42), 0);
        assert_eq!(
            policy.status_for_error(&Error::fetch("a/b@main", "timed out")),
            1
        );
        assert_eq!(
            policy.status_for_error(&Error::MissingConfig("source.repo")),
            2
        );
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render(&report(3), OutputFormat::Text).unwrap(), "3");
    }

    #[test]
    fn test_render_json() {
        let json = render(&report(3), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["value"], 3);
        assert_eq!(value["aggregation"], "single");
        assert_eq!(value["unit_seconds"], 86_400);
        assert_eq!(value["branches"][0]["reference"]["branch"], "jp");
        let committed_at = value["branches"][0]["committed_at"].as_str().unwrap();
        assert_eq!(
            DateTime::parse_from_rfc3339(committed_at).unwrap(),
            DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_resolve_output_file() {
        let explicit = Some(PathBuf::from("/tmp/out"));
        let env = Some(OsString::from("/tmp/gh"));

        assert_eq!(
            resolve_output_file(explicit.clone(), true, env.clone()),
            explicit
        );
        assert_eq!(
            resolve_output_file(None, true, env.clone()),
            Some(PathBuf::from("/tmp/gh"))
        );
        assert_eq!(resolve_output_file(None, false, env), None);
        assert_eq!(resolve_output_file(None, true, Some(OsString::new())), None);
        assert_eq!(resolve_output_file(None, true, None), None);
    }

    #[test]
    fn test_append_output_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("github_output");
        std::fs::write(&path, "previous=1\n").unwrap();

        append_output_file(&path, 5, Some(3)).unwrap();
        append_output_file(&path, 0, None).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "previous=1\nfreshness=5\nstale=true\nfreshness=0\n");
    }

    #[test]
    fn test_is_stale() {
        assert!(!is_stale(3, 3));
        assert!(is_stale(4, 3));
        assert!(!is_stale(0, 0));
    }
}
