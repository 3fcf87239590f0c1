//! Durable scrape of qualifying repositories
//!
//! A run writes its ordered repository list to the step ledger when it
//! starts, then walks the ledger one repository at a time. Each step commits
//! its influence merges together with its completion flag, so a crashed run
//! can be resumed from the ledger without re-applying finished steps.

mod aggregate;
mod fetch;
mod repo;

pub use aggregate::apply_step;
pub use fetch::{fetch_repo_contributions, RepoContributions};
pub use repo::{repo_html_url, RepoRef};

use crate::error::{PeripheryError, Result};
use crate::github::HostingApi;
use crate::model::{LogLevel, ScrapeProgress, ScrapeStep};
use crate::scoring::select_qualifying;
use crate::storage::Database;
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle of a project's scrape as seen by readers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    NotStarted,
    Running,
    Finished,
}

impl ScrapeState {
    pub fn of(progress: Option<&ScrapeProgress>) -> Self {
        match progress {
            None => ScrapeState::NotStarted,
            Some(p) if p.finished => ScrapeState::Finished,
            Some(_) => ScrapeState::Running,
        }
    }
}

/// Identity of one scrape run, passed to every step
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRun {
    pub run_id: String,
    pub project_id: String,
    pub cutoff: f64,
}

impl ScrapeRun {
    pub fn new(project_id: &str, cutoff: f64) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            cutoff,
        }
    }
}

pub struct ScrapeWorkflow {
    db: Arc<Database>,
    hosting: Arc<dyn HostingApi>,
    cutoff: f64,
}

impl ScrapeWorkflow {
    pub fn new(db: Arc<Database>, hosting: Arc<dyn HostingApi>, cutoff: f64) -> Self {
        Self {
            db,
            hosting,
            cutoff,
        }
    }

    /// Start a new run over the project's qualifying repositories.
    ///
    /// Fails with `ScrapeInProgress` while another run holds the project lock.
    pub async fn start(&self, project_id: &str) -> Result<ScrapeProgress> {
        let run = ScrapeRun::new(project_id, self.cutoff);
        self.db.acquire_scrape_lock(project_id, &run.run_id)?;
        tracing::info!("Scrape run {} started for project {}", run.run_id, project_id);

        let result = match self.begin(&run) {
            Ok(()) => self.drive(&run).await,
            Err(e) => Err(e),
        };
        self.settle(&run, result)
    }

    /// Continue the project's unfinished run from its first incomplete step
    pub async fn resume(&self, project_id: &str) -> Result<ScrapeProgress> {
        let run_id = match self.db.get_progress(project_id)? {
            Some(ScrapeProgress {
                finished: false,
                run_id: Some(run_id),
                ..
            }) => run_id,
            _ => {
                return Err(PeripheryError::NothingToResume {
                    project_id: project_id.to_string(),
                })
            }
        };

        let run = ScrapeRun {
            run_id,
            project_id: project_id.to_string(),
            cutoff: self.cutoff,
        };
        self.db.acquire_scrape_lock(project_id, &run.run_id)?;
        tracing::info!("Resuming scrape run {} for project {}", run.run_id, project_id);
        self.log(&run, LogLevel::Info, "Resuming scrape", Some("resume"));

        let result = self.drive(&run).await;
        self.settle(&run, result)
    }

    /// Transition to running: progress row and ledger for the qualifying set
    fn begin(&self, run: &ScrapeRun) -> Result<()> {
        let qualifying = select_qualifying(self.db.dependencies_in_order(&run.project_id)?, run.cutoff);
        let urls: Vec<String> = qualifying
            .into_iter()
            .filter_map(|d| d.repository_url)
            .collect();

        self.db.begin_scrape(&run.project_id, &run.run_id, &urls)?;
        self.log(
            run,
            LogLevel::Info,
            &format!("Starting scrape for {} repos", urls.len()),
            Some("start"),
        );
        Ok(())
    }

    /// Walk the ledger in order, skipping steps already complete
    async fn drive(&self, run: &ScrapeRun) -> Result<ScrapeProgress> {
        let steps = self.db.run_steps(&run.run_id)?;
        let total = steps.len();

        for step in steps.iter().filter(|s| !s.completed) {
            self.process_step(run, step).await?;
        }

        let progress = self.db.finish_scrape(&run.project_id)?;
        self.log(
            run,
            LogLevel::Info,
            &format!("Finished scrape for {} repos", total),
            Some("done"),
        );
        Ok(progress)
    }

    async fn process_step(&self, run: &ScrapeRun, step: &ScrapeStep) -> Result<()> {
        let Some(repo) = RepoRef::parse(&step.repository_url) else {
            tracing::warn!("Cannot parse repository URL {}", step.repository_url);
            self.log(
                run,
                LogLevel::Warn,
                &format!("Skipping unparseable repository URL {}", step.repository_url),
                Some("invalid_repo"),
            );
            let progress = apply_step(&self.db, run, step.step_index, None)?;
            self.log_progress(run, &step.repository_url, &progress);
            return Ok(());
        };

        if !self.hosting.supports_host(&repo.host) {
            tracing::warn!("No hosting client for {}", step.repository_url);
            self.log(
                run,
                LogLevel::Warn,
                &format!("Skipping repository on unsupported host {}", step.repository_url),
                Some("invalid_repo"),
            );
            let progress = apply_step(&self.db, run, step.step_index, None)?;
            self.log_progress(run, &step.repository_url, &progress);
            return Ok(());
        }

        self.log(
            run,
            LogLevel::Info,
            &format!("Fetching repo {}", repo),
            Some("fetch_repo"),
        );

        let contributions = fetch_repo_contributions(self.hosting.as_ref(), &repo).await;
        if contributions.should_report_exclusions() {
            self.log(
                run,
                LogLevel::Info,
                &format!(
                    "Excluded {} org member(s) from {}",
                    contributions.excluded, repo.owner
                ),
                Some("exclude_org_members"),
            );
        }

        let progress = apply_step(&self.db, run, step.step_index, Some((&repo, &contributions)))?;
        self.log_progress(run, &repo.to_string(), &progress);
        Ok(())
    }

    /// Release the lock; a failed run also leaves an error entry behind
    fn settle(&self, run: &ScrapeRun, result: Result<ScrapeProgress>) -> Result<ScrapeProgress> {
        if let Err(e) = &result {
            tracing::error!("Scrape run {} failed: {}", run.run_id, e);
            self.log(run, LogLevel::Error, &format!("Scrape failed: {}", e), Some("failed"));
        }

        if let Err(e) = self.db.release_scrape_lock(&run.project_id, &run.run_id) {
            tracing::warn!("Failed to release scrape lock for {}: {}", run.project_id, e);
        }

        result
    }

    fn log_progress(&self, run: &ScrapeRun, label: &str, progress: &ScrapeProgress) {
        self.log(
            run,
            LogLevel::Info,
            &format!(
                "Processed {} ({}/{})",
                label, progress.processed_repos, progress.total_repos
            ),
            Some("progress"),
        );
    }

    /// The log is observational; a failed append never stops the run
    fn log(&self, run: &ScrapeRun, level: LogLevel, message: &str, step: Option<&str>) {
        if let Err(e) = self.db.append_log(&run.project_id, level, message, step) {
            tracing::warn!("Failed to append scrape log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_progress() {
        assert_eq!(ScrapeState::of(None), ScrapeState::NotStarted);

        let mut progress = ScrapeProgress {
            project_id: "p".to_string(),
            run_id: Some("r".to_string()),
            finished: false,
            total_repos: 2,
            processed_repos: 1,
            percent: 50,
            updated_at: chrono::Utc::now(),
        };
        assert_eq!(ScrapeState::of(Some(&progress)), ScrapeState::Running);

        progress.finished = true;
        assert_eq!(ScrapeState::of(Some(&progress)), ScrapeState::Finished);
    }

    #[test]
    fn test_runs_get_distinct_ids() {
        let a = ScrapeRun::new("p", 0.35);
        let b = ScrapeRun::new("p", 0.35);
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.project_id, "p");
    }
}
