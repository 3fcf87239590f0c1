//! In-process stand-ins for the registry, hosting API and scoring model
#![allow(dead_code)]

use async_trait::async_trait;
use periphery::analysis::Periphery;
use periphery::config::Config;
use periphery::error::{PeripheryError, Result};
use periphery::github::HostingApi;
use periphery::model::Contributor;
use periphery::registry::PackageRegistry;
use periphery::scoring::ScoringModel;
use periphery::storage::Database;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Registry that knows a fixed set of packages; everything else is a 404
#[derive(Default)]
pub struct FakeRegistry {
    packages: HashMap<String, Value>,
}

impl FakeRegistry {
    pub fn with_repo(mut self, package: &str, repository_url: &str) -> Self {
        self.packages.insert(
            package.to_string(),
            json!({
                "name": package,
                "dist-tags": {"latest": "1.0.0"},
                "versions": {"1.0.0": {"repository": {"type": "git", "url": repository_url}}}
            }),
        );
        self
    }

    pub fn without_repo(mut self, package: &str) -> Self {
        self.packages
            .insert(package.to_string(), json!({"name": package}));
        self
    }
}

#[async_trait]
impl PackageRegistry for FakeRegistry {
    async fn fetch_metadata(&self, package: &str) -> Result<Value> {
        self.packages.get(package).cloned().ok_or_else(|| {
            PeripheryError::Other(anyhow::anyhow!("registry returned 404 for {}", package))
        })
    }
}

/// Hosting API for URLs on `host`, backed by fixed tables, recording every
/// repository fetched
#[derive(Default)]
pub struct FakeHosting {
    members: HashMap<String, Vec<String>>,
    committers: HashMap<String, Vec<Contributor>>,
    issuers: HashMap<String, Vec<Contributor>>,
    pub fetched: Mutex<Vec<String>>,
    /// When set, progress is sampled each time a repository is fetched
    pub observe: Mutex<Option<(Arc<Database>, String)>>,
    pub observed: Mutex<Vec<(u32, u32, u8)>>,
}

pub fn contributor(login: &str, count: u64) -> Contributor {
    Contributor {
        login: login.to_string(),
        profile_url: Some(format!("https://host/{}", login)),
        count,
    }
}

impl FakeHosting {
    pub fn member(mut self, org: &str, login: &str) -> Self {
        self.members
            .entry(org.to_string())
            .or_default()
            .push(login.to_string());
        self
    }

    pub fn commits(mut self, repo: &str, login: &str, count: u64) -> Self {
        self.committers
            .entry(repo.to_string())
            .or_default()
            .push(contributor(login, count));
        self
    }

    pub fn issues(mut self, repo: &str, login: &str, count: u64) -> Self {
        self.issuers
            .entry(repo.to_string())
            .or_default()
            .push(contributor(login, count));
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostingApi for FakeHosting {
    fn supports_host(&self, host: &str) -> bool {
        host == "host"
    }

    async fn org_public_members(&self, org: &str) -> Vec<String> {
        self.members.get(org).cloned().unwrap_or_default()
    }

    async fn commit_contributors(&self, owner: &str, repo: &str) -> Vec<Contributor> {
        let key = format!("{}/{}", owner, repo);
        self.fetched.lock().unwrap().push(key.clone());

        if let Some((db, project_id)) = self.observe.lock().unwrap().as_ref() {
            if let Some(p) = db.get_progress(project_id).unwrap() {
                self.observed
                    .lock()
                    .unwrap()
                    .push((p.processed_repos, p.total_repos, p.percent));
            }
        }

        self.committers.get(&key).cloned().unwrap_or_default()
    }

    async fn issue_creators(&self, owner: &str, repo: &str) -> Vec<Contributor> {
        let key = format!("{}/{}", owner, repo);
        self.issuers.get(&key).cloned().unwrap_or_default()
    }
}

/// Scoring model with a canned reply, recording the prompts it was sent
pub struct FakeModel {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model whose every call fails, like a missing API key
    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ScoringModel for FakeModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| PeripheryError::Scoring("model unavailable".to_string()))
    }
}

pub struct Harness {
    pub _dir: TempDir,
    pub db: Arc<Database>,
    pub hosting: Arc<FakeHosting>,
    pub model: Arc<FakeModel>,
    pub app: Periphery,
}

pub fn harness(registry: FakeRegistry, hosting: FakeHosting, model: FakeModel) -> Harness {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = Arc::new(Database::new(&dir.path().join("periphery.sqlite")).expect("Failed to open db"));
    let hosting = Arc::new(hosting);
    let model = Arc::new(model);

    let app = Periphery::new(
        Arc::clone(&db),
        Arc::new(registry),
        hosting.clone(),
        model.clone(),
        &Config::default(),
    );

    Harness {
        _dir: dir,
        db,
        hosting,
        model,
        app,
    }
}
