//! freshcheck library.
//!
//! Reports how many whole days (or other units) have passed since the
//! latest commit on one or more branches of a remote repository.

pub mod cli;
pub mod config;
pub mod error;
pub mod freshness;
pub mod github;
pub mod report;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::Error;
