//! Pipeline context and the entry points collaborators call
//!
//! [`Periphery`] owns the store and the three upstream clients. The research
//! stage (aggregate, resolve, score) runs inside [`Periphery::start_analysis`]
//! and hands off to the scrape stage on success.

mod detail;

pub use detail::{UserDetail, UserRepoDetail};

use crate::config::{AnalysisConfig, Config};
use crate::error::Result;
use crate::github::{GithubClient, HostingApi};
use crate::manifest::aggregate_manifests;
use crate::model::{Dependency, LogEntry, ScrapeProgress, UserInfluence};
use crate::registry::{resolve_dependencies, NpmRegistry, PackageRegistry};
use crate::scoring::{score_dependencies, select_qualifying, AnthropicModel, ScoringModel};
use crate::scrape::{ScrapeState, ScrapeWorkflow};
use crate::storage::{AnalysisStatus, Database};
use std::sync::Arc;

/// Counts from the research stage plus the scrape outcome
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub dependencies: usize,
    pub with_repository: usize,
    pub scored: usize,
    pub progress: ScrapeProgress,
}

struct ResearchCounts {
    dependencies: usize,
    with_repository: usize,
    scored: usize,
}

pub struct Periphery {
    db: Arc<Database>,
    registry: Arc<dyn PackageRegistry>,
    hosting: Arc<dyn HostingApi>,
    model: Arc<dyn ScoringModel>,
    analysis: AnalysisConfig,
    registry_concurrency: usize,
}

impl Periphery {
    pub fn new(
        db: Arc<Database>,
        registry: Arc<dyn PackageRegistry>,
        hosting: Arc<dyn HostingApi>,
        model: Arc<dyn ScoringModel>,
        config: &Config,
    ) -> Self {
        Self {
            db,
            registry,
            hosting,
            model,
            analysis: config.analysis.clone(),
            registry_concurrency: config.registry.concurrency,
        }
    }

    /// Open the configured database and build the HTTP clients
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Arc::new(Database::new(&config.database_path())?);
        let client = reqwest::Client::new();

        let registry = Arc::new(NpmRegistry::new(client.clone(), &config.registry));
        let hosting = Arc::new(GithubClient::new(client.clone(), &config.github)?);
        let model = Arc::new(AnthropicModel::new(client, config.llm.clone()));

        Ok(Self::new(db, registry, hosting, model, config))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn workflow(&self) -> ScrapeWorkflow {
        ScrapeWorkflow::new(
            Arc::clone(&self.db),
            Arc::clone(&self.hosting),
            self.analysis.signal_cutoff,
        )
    }

    /// Run the research stage, then start the scrape stage.
    ///
    /// A research failure marks the project `failed`. A scrape failure is
    /// returned but leaves the analysis status `complete`.
    pub async fn start_analysis(&self, project_id: &str) -> Result<AnalysisSummary> {
        self.db.require_project(project_id)?;
        self.db
            .set_analysis_status(project_id, AnalysisStatus::Processing)?;

        let counts = match self.research(project_id).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::error!("Analysis of project {} failed: {}", project_id, e);
                if let Err(status_err) = self
                    .db
                    .set_analysis_status(project_id, AnalysisStatus::Failed)
                {
                    tracing::warn!("Failed to mark project {} failed: {}", project_id, status_err);
                }
                return Err(e);
            }
        };

        self.db
            .set_analysis_status(project_id, AnalysisStatus::Complete)?;

        let progress = self.workflow().start(project_id).await?;

        Ok(AnalysisSummary {
            dependencies: counts.dependencies,
            with_repository: counts.with_repository,
            scored: counts.scored,
            progress,
        })
    }

    async fn research(&self, project_id: &str) -> Result<ResearchCounts> {
        let manifests = self.db.list_manifests(project_id)?;
        let declared = aggregate_manifests(manifests.iter().map(|m| m.content.as_str()));
        tracing::info!(
            "Project {}: {} dependencies across {} manifest(s)",
            project_id,
            declared.len(),
            manifests.len()
        );

        let resolved =
            resolve_dependencies(self.registry.as_ref(), declared, self.registry_concurrency).await;
        self.db.replace_dependencies(project_id, &resolved)?;

        let candidates: Vec<String> = resolved
            .iter()
            .filter(|d| d.repository_url.is_some())
            .map(|d| d.package_name.clone())
            .collect();

        let scores = score_dependencies(self.model.as_ref(), &candidates).await?;
        let scored = self.db.update_dependency_scores(project_id, &scores)?;

        Ok(ResearchCounts {
            dependencies: resolved.len(),
            with_repository: candidates.len(),
            scored,
        })
    }

    /// Continue an unfinished scrape from its ledger
    pub async fn resume(&self, project_id: &str) -> Result<ScrapeProgress> {
        self.db.require_project(project_id)?;
        self.workflow().resume(project_id).await
    }

    /// Dependencies by signal, unscored last
    pub fn list_dependencies(&self, project_id: &str) -> Result<Vec<Dependency>> {
        self.db.list_dependencies(project_id)
    }

    pub fn signal_cutoff(&self) -> f64 {
        self.analysis.signal_cutoff
    }

    /// Dependencies that qualify for scraping, in enumeration order
    pub fn list_qualifying(&self, project_id: &str) -> Result<Vec<Dependency>> {
        Ok(select_qualifying(
            self.db.dependencies_in_order(project_id)?,
            self.analysis.signal_cutoff,
        ))
    }

    pub fn get_progress(&self, project_id: &str) -> Result<Option<ScrapeProgress>> {
        self.db.get_progress(project_id)
    }

    pub fn scrape_state(&self, project_id: &str) -> Result<ScrapeState> {
        Ok(ScrapeState::of(self.db.get_progress(project_id)?.as_ref()))
    }

    pub fn list_logs(&self, project_id: &str) -> Result<Vec<LogEntry>> {
        self.db.list_logs(project_id, self.analysis.log_limit)
    }

    pub fn list_influence(&self, project_id: &str) -> Result<Vec<UserInfluence>> {
        self.db.list_influence(project_id)
    }

    /// Totals and per-repository breakdown for one contributor
    pub fn user_detail(&self, project_id: &str, username: &str) -> Result<UserDetail> {
        let global = self.db.get_user_influence(project_id, username)?;
        let repos = self.db.list_user_repo_influence(project_id, username)?;
        let total_relevant_repos = self.list_qualifying(project_id)?.len();
        Ok(UserDetail::build(
            username,
            global,
            repos,
            total_relevant_repos,
        ))
    }
}
