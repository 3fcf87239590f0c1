//! Domain records shared by the pipeline stages and the storage layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dependency as declared in the project's manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDependency {
    pub package_name: String,
    pub version_spec: String,
}

/// A declared dependency after the registry lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub package_name: String,
    pub version_spec: String,
    pub repository_url: Option<String>,
}

/// Relevance and niche ratings plus their product.
///
/// Inputs are clamped to `[0, 1]` on construction, so `signal` is always
/// in `[0, 1]` as well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DependencyScores {
    pub relevance: f64,
    pub niche: f64,
    pub signal: f64,
}

impl DependencyScores {
    pub fn new(relevance: f64, niche: f64) -> Self {
        let relevance = clamp_unit(relevance);
        let niche = clamp_unit(niche);
        Self {
            relevance,
            niche,
            signal: relevance * niche,
        }
    }

    /// Fallback used when a model response cannot be decoded at all
    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Clamp to `[0, 1]`; NaN maps to 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Persisted dependency row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: i64,
    pub project_id: String,
    pub package_name: String,
    pub version_spec: String,
    pub repository_url: Option<String>,
    /// Absent until the scorer rated this dependency
    pub scores: Option<DependencyScores>,
}

impl Dependency {
    pub fn signal(&self) -> Option<f64> {
        self.scores.map(|s| s.signal)
    }

    /// Qualifies for deep scraping: has a repository and a signal at or above the cutoff
    pub fn qualifies(&self, cutoff: f64) -> bool {
        self.repository_url.is_some() && self.signal().is_some_and(|s| s >= cutoff)
    }
}

/// Scrape progress row, one per project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeProgress {
    pub project_id: String,
    pub run_id: Option<String>,
    pub finished: bool,
    pub total_repos: u32,
    pub processed_repos: u32,
    pub percent: u8,
    pub updated_at: DateTime<Utc>,
}

/// Percentage of processed repositories, rounded half up.
///
/// Zero processed out of zero total reads as 0 here; the workflow sets 100
/// explicitly for an empty run.
pub fn percent_complete(processed: u32, total: u32) -> u8 {
    let ratio = processed as f64 / total.max(1) as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// One entry of a run's step ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeStep {
    pub run_id: String,
    pub step_index: u32,
    pub repository_url: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Immutable entry of the user-facing scrape log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub project_id: String,
    pub level: LogLevel,
    pub message: String,
    pub step: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Running totals for one contributor across all scraped repositories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfluence {
    pub project_id: String,
    pub username: String,
    pub profile_url: Option<String>,
    pub commits: u64,
    pub issues: u64,
}

impl UserInfluence {
    pub fn total(&self) -> u64 {
        self.commits + self.issues
    }
}

/// Running totals for one contributor in one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRepoInfluence {
    pub project_id: String,
    pub username: String,
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub commits: u64,
    pub issues: u64,
}

/// A user with a count of contributions of one kind (commits or issues)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub profile_url: Option<String>,
    pub count: u64,
}
