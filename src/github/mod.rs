//! Client for the GitHub commits API.

pub mod client;
pub mod types;

pub use client::{ClientOptions, GithubClient, DEFAULT_API_BASE};
pub use types::CommitResponse;
