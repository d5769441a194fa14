//! Freshness checker.
//!
//! Fetches the latest commit time of every configured branch, converts each
//! to elapsed units and combines them into a single value.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info, warn};

use super::{
    elapsed_units, Aggregation, BranchFreshness, CommitReference, FreshnessReport, FreshnessUnit,
};
use crate::error::Error;

/// Anything that can report when a branch last received a commit.
pub trait CommitSource: Send + Sync + 'static {
    /// Author timestamp of the latest commit reachable from the branch.
    fn latest_commit_time(
        &self,
        reference: &CommitReference,
    ) -> impl Future<Output = Result<DateTime<FixedOffset>, Error>> + Send;
}

/// Computes freshness for a fixed set of branches.
pub struct FreshnessChecker<S> {
    source: Arc<S>,
    references: Vec<CommitReference>,
    unit: FreshnessUnit,
    aggregation: Aggregation,
}

impl<S: CommitSource> FreshnessChecker<S> {
    /// Create a checker. Fails if the branch list does not fit the aggregation.
    pub fn new(
        source: S,
        references: Vec<CommitReference>,
        unit: FreshnessUnit,
        aggregation: Aggregation,
    ) -> Result<Self, Error> {
        aggregation.validate(references.len())?;

        Ok(Self {
            source: Arc::new(source),
            references,
            unit,
            aggregation,
        })
    }

    /// Run the check against the given instant.
    pub async fn check(&self, now: DateTime<Utc>) -> Result<FreshnessReport, Error> {
        debug!(
            branches = self.references.len(),
            unit_seconds = self.unit.seconds(),
            aggregation = %self.aggregation,
            "Checking freshness"
        );

        // Branches are independent, fetch them all at once
        let handles: Vec<_> = self
            .references
            .iter()
            .cloned()
            .map(|reference| {
                let source = Arc::clone(&self.source);
                tokio::spawn(async move { source.latest_commit_time(&reference).await })
            })
            .collect();

        let mut branches = Vec::with_capacity(handles.len());
        for (reference, handle) in self.references.iter().zip(handles) {
            let committed_at = handle
                .await
                .map_err(|e| Error::fetch(reference, format!("fetch task failed: {}", e)))??;

            if committed_at.with_timezone(&Utc) > now {
                warn!(
                    reference = %reference,
                    committed_at = %committed_at.to_rfc3339(),
                    "Latest commit is dated in the future, treating as zero elapsed"
                );
            }

            let elapsed = elapsed_units(committed_at, now, self.unit);
            info!(
                reference = %reference,
                committed_at = %committed_at.to_rfc3339(),
                elapsed,
                "Branch freshness"
            );

            branches.push(BranchFreshness {
                reference: reference.clone(),
                committed_at,
                elapsed_units: elapsed,
            });
        }

        let values: Vec<u64> = branches.iter().map(|b| b.elapsed_units).collect();
        let value = self
            .aggregation
            .apply(&values)
            .ok_or(Error::MissingConfig("source.branches"))?;

        Ok(FreshnessReport {
            checked_at: now,
            unit_seconds: self.unit.seconds(),
            aggregation: self.aggregation,
            branches,
            value,
        })
    }
}
