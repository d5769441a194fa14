//! Write a starter config file.

use std::path::Path;

use tracing::info;

use super::SourceArgs;
use crate::config::Config;
use crate::error::Error;

/// Run the init command.
pub fn run(config_path: Option<&Path>, args: SourceArgs, force: bool) -> Result<(), Error> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::path);

    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("Run 'freshcheck init --force' to overwrite it.");
        return Ok(());
    }

    let mut config = Config::default();
    config.apply(args.into());
    config.save(&path)?;
    info!(path = %path.display(), "Wrote config");

    println!("Wrote {}", path.display());
    if let Err(e) = config.references() {
        println!("Before running 'freshcheck check': {}", e);
    }

    Ok(())
}
