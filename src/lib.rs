//! Periphery - dependency influence analysis
//!
//! Given a project's dependency manifests, resolves each dependency to its
//! source repository, scores dependencies for how much they matter to the
//! project, and tallies commits and issues from contributors outside each
//! qualifying repository's own organization.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod manifest;
pub mod model;
pub mod registry;
pub mod scoring;
pub mod scrape;
pub mod storage;

pub use analysis::Periphery;
pub use error::{PeripheryError, Result};
