//! Run a freshness check.

use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use super::CheckArgs;
use crate::config::Config;
use crate::error::Error;
use crate::freshness::{CommitSource, FreshnessChecker, FreshnessReport};
use crate::github::GithubClient;
use crate::report::{self, ExitStatusPolicy, GITHUB_OUTPUT_ENV};

/// Run the check command and return the process exit status.
pub async fn run(config_path: Option<&Path>, args: CheckArgs) -> u8 {
    // Until the config is loaded only the flag can pick the policy
    let fallback = args.source.exit_status.unwrap_or_default();

    let config = match resolve_config(config_path, &args) {
        Ok(config) => config,
        Err(e) => return fail(fallback, &e),
    };
    let policy = config.output.exit_status;

    match execute(&config, &args).await {
        Ok(report) => policy.status_for_value(report.value),
        Err(e) => fail(policy, &e),
    }
}

/// Load the config file and layer flags and environment on top.
pub fn resolve_config(config_path: Option<&Path>, args: &CheckArgs) -> Result<Config, Error> {
    let mut config = Config::load(config_path)?;
    config.apply(args.source.clone().into());
    Ok(config)
}

/// Check against the live API and publish the result.
async fn execute(config: &Config, args: &CheckArgs) -> Result<FreshnessReport, Error> {
    let client = GithubClient::new(config.client_options()?)?;
    info!(api_base = %client.api_base(), "Checking freshness");

    let report = check_with(client, config, Utc::now()).await?;
    publish(&report, config, args, &mut io::stdout().lock())?;
    Ok(report)
}

/// Run a check against any commit source at a fixed instant. Configuration
/// is validated before the source is asked for anything.
pub async fn check_with<S: CommitSource>(
    source: S,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<FreshnessReport, Error> {
    let references = config.references()?;
    let unit = config.unit()?;
    let checker = FreshnessChecker::new(source, references, unit, config.policy.aggregation)?;
    checker.check(now).await
}

/// Write the report to `out` and append the step-output file if one applies.
///
/// A write failure on `out` (closed pipe) is an `Error::Io`, so it maps to the
/// failure status instead of aborting the process.
pub fn publish(
    report: &FreshnessReport,
    config: &Config,
    args: &CheckArgs,
    out: &mut impl Write,
) -> Result<(), Error> {
    writeln!(out, "{}", report::render(report, config.output.format)?)?;
    out.flush()?;

    if let Some(max_age) = args.max_age {
        info!(
            value = report.value,
            max_age,
            stale = report::is_stale(report.value, max_age),
            "Compared against maximum age"
        );
    }

    let output_file = report::resolve_output_file(
        args.output_file.clone(),
        config.output.github_output,
        std::env::var_os(GITHUB_OUTPUT_ENV),
    );
    if let Some(path) = output_file {
        report::append_output_file(&path, report.value, args.max_age)?;
    }

    Ok(())
}

fn fail(policy: ExitStatusPolicy, e: &Error) -> u8 {
    error!("{}", e);
    let _ = writeln!(io::stderr(), "error: {}", e);
    policy.status_for_error(e)
}
