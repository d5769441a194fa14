//! Show the resolved configuration.

use std::path::Path;

use super::SourceArgs;
use crate::config::Config;
use crate::error::Error;

/// Print the configuration after layering file, environment and flags.
pub fn show(config_path: Option<&Path>, args: SourceArgs) -> Result<(), Error> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::path);

    let mut config = Config::load(config_path)?;
    config.apply(args.into());

    if path.exists() {
        println!("# Config file: {}", path.display());
    } else {
        println!("# No config file at {}, showing defaults", path.display());
    }
    println!("{}", config.to_toml()?);

    if let Err(e) = config.references() {
        println!("# Not ready to check: {}", e);
    }

    Ok(())
}
