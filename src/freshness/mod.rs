//! Freshness arithmetic.
//!
//! A branch's freshness is the number of whole units (days by default) that
//! have passed since its latest commit was authored. Division truncates, so
//! three and a half days is reported as 3.

pub mod checker;

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use checker::{CommitSource, FreshnessChecker};

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// A branch of a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReference {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl CommitReference {
    /// Build a reference, rejecting blank or path-like owner and repo names.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Result<Self, Error> {
        let owner = owner.into().trim().to_string();
        let repo = repo.into().trim().to_string();
        let branch = branch.into().trim().to_string();

        if owner.is_empty() {
            return Err(Error::MissingConfig("source.owner"));
        }
        if repo.is_empty() {
            return Err(Error::MissingConfig("source.repo"));
        }
        if branch.is_empty() {
            return Err(Error::InvalidConfig("branch name is empty".to_string()));
        }
        if owner.contains('/') || repo.contains('/') {
            return Err(Error::InvalidConfig(format!(
                "owner and repo must not contain '/': {}/{}",
                owner, repo
            )));
        }

        Ok(Self {
            owner,
            repo,
            branch,
        })
    }
}

impl fmt::Display for CommitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

/// Named unit sizes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum UnitPreset {
    /// One unit per day
    #[default]
    Day,
    /// One unit per three days (less sensitive)
    ThreeDays,
}

impl UnitPreset {
    pub fn unit(self) -> FreshnessUnit {
        match self {
            Self::Day => FreshnessUnit::DAY,
            Self::ThreeDays => FreshnessUnit::THREE_DAYS,
        }
    }
}

/// Length of one freshness unit, in seconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FreshnessUnit(u64);

impl FreshnessUnit {
    pub const DAY: Self = Self(SECONDS_PER_DAY);
    pub const THREE_DAYS: Self = Self(3 * SECONDS_PER_DAY);

    pub fn from_seconds(seconds: u64) -> Result<Self, Error> {
        if seconds == 0 {
            return Err(Error::InvalidConfig(
                "unit_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(Self(seconds))
    }

    pub fn seconds(self) -> u64 {
        self.0
    }
}

impl Default for FreshnessUnit {
    fn default() -> Self {
        Self::DAY
    }
}

/// How per-branch values are combined into one result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Smallest value across all branches (the most recently updated one)
    #[default]
    Min,
    /// Exactly one branch; its value is the result
    Single,
}

impl Aggregation {
    /// Check that a branch count is acceptable for this aggregation.
    pub fn validate(self, branch_count: usize) -> Result<(), Error> {
        if branch_count == 0 {
            return Err(Error::MissingConfig("source.branches"));
        }
        if self == Self::Single && branch_count != 1 {
            return Err(Error::InvalidConfig(format!(
                "aggregation 'single' needs exactly one branch, got {}",
                branch_count
            )));
        }
        Ok(())
    }

    /// Combine per-branch values. Returns None for an empty slice.
    pub fn apply(self, values: &[u64]) -> Option<u64> {
        match self {
            Self::Min => values.iter().copied().min(),
            Self::Single => values.first().copied(),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min => write!(f, "min"),
            Self::Single => write!(f, "single"),
        }
    }
}

/// Whole units elapsed between `committed_at` and `now`, truncated.
///
/// A commit dated after `now` counts as zero elapsed time.
pub fn elapsed_units(
    committed_at: DateTime<FixedOffset>,
    now: DateTime<Utc>,
    unit: FreshnessUnit,
) -> u64 {
    let elapsed = now - committed_at.with_timezone(&Utc);
    let seconds = elapsed.num_seconds();
    if seconds <= 0 {
        return 0;
    }
    seconds as u64 / unit.seconds()
}

/// Freshness of one branch.
#[derive(Debug, Clone, Serialize)]
pub struct BranchFreshness {
    pub reference: CommitReference,
    pub committed_at: DateTime<FixedOffset>,
    pub elapsed_units: u64,
}

/// Result of one check.
#[derive(Debug, Clone, Serialize)]
pub struct FreshnessReport {
    pub checked_at: DateTime<Utc>,
    pub unit_seconds: u64,
    pub aggregation: Aggregation,
    pub branches: Vec<BranchFreshness>,
    pub value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        ts(s).with_timezone(&Utc)
    }

    #[test]
    fn test_elapsed_truncates_days() {
        let committed = ts("2024-01-01T00:00:00Z");
        let now = utc("2024-01-04T12:00:00Z");
        assert_eq!(elapsed_units(committed, now, FreshnessUnit::DAY), 3);
    }

    #[test]
    fn test_elapsed_three_day_unit() {
        let committed = ts("2024-01-01T00:00:00Z");
        let now = utc("2024-01-04T12:00:00Z");
        assert_eq!(elapsed_units(committed, now, FreshnessUnit::THREE_DAYS), 1);
    }

    #[test]
    fn test_elapsed_respects_offset() {
        // 2024-01-02T08:00:00+09:00 is 2024-01-01T23:00:00Z
        let committed = ts("2024-01-02T08:00:00+09:00");
        let now = utc("2024-01-02T22:59:59Z");
        assert_eq!(elapsed_units(committed, now, FreshnessUnit::DAY), 0);
        let now = utc("2024-01-02T23:00:00Z");
        assert_eq!(elapsed_units(committed, now, FreshnessUnit::DAY), 1);
    }

    #[test]
    fn test_elapsed_future_commit_is_zero() {
        let committed = ts("2024-01-05T00:00:00Z");
        let now = utc("2024-01-04T00:00:00Z");
        assert_eq!(elapsed_units(committed, now, FreshnessUnit::DAY), 0);
    }

    #[test]
    fn test_elapsed_is_monotonic() {
        let committed = ts("2024-01-01T00:00:00Z");
        let start = utc("2024-01-01T00:00:00Z");
        let mut last = 0;
        for hours in (0..24 * 20).step_by(7) {
            let now = start + chrono::Duration::hours(hours);
            let value = elapsed_units(committed, now, FreshnessUnit::DAY);
            assert!(value >= last);
            last = value;
        }
        assert_eq!(last, 19);
    }

    #[test]
    fn test_custom_unit() {
        let unit = FreshnessUnit::from_seconds(3600).unwrap();
        let committed = ts("2024-01-01T00:00:00Z");
        let now = utc("2024-01-01T05:59:59Z");
        assert_eq!(elapsed_units(committed, now, unit), 5);
    }

    #[test]
    fn test_zero_unit_rejected() {
        let err = FreshnessUnit::from_seconds(0).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unit_presets() {
        assert_eq!(UnitPreset::Day.unit().seconds(), 86_400);
        assert_eq!(UnitPreset::ThreeDays.unit().seconds(), 259_200);
    }

    #[test]
    fn test_aggregation_min() {
        assert_eq!(Aggregation::Min.apply(&[5, 2, 9]), Some(2));
        assert_eq!(Aggregation::Min.apply(&[]), None);
    }

    #[test]
    fn test_aggregation_validate() {
        assert!(Aggregation::Min.validate(2).is_ok());
        assert!(Aggregation::Single.validate(1).is_ok());
        assert!(matches!(
            Aggregation::Single.validate(2),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Aggregation::Min.validate(0),
            Err(Error::MissingConfig("source.branches"))
        ));
    }

    #[test]
    fn test_reference_validation() {
        let reference = CommitReference::new(" electricgoat ", "ba-data", "jp").unwrap();
        assert_eq!(reference.to_string(), "electricgoat/ba-data@jp");

        assert!(matches!(
            CommitReference::new("", "ba-data", "jp"),
            Err(Error::MissingConfig("source.owner"))
        ));
        assert!(matches!(
            CommitReference::new("electricgoat", "  ", "jp"),
            Err(Error::MissingConfig("source.repo"))
        ));
        assert!(CommitReference::new("a/b", "c", "jp").is_err());
        assert!(CommitReference::new("a", "c", "").is_err());
    }
}
