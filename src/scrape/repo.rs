use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A hosted repository addressed by host, owner and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub host: String,
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse `https://host/owner/repo[/...]`; a trailing `.git` on the name is dropped
    pub fn parse(repository_url: &str) -> Option<Self> {
        let url = Url::parse(repository_url.trim()).ok()?;
        let host = url.host_str()?.to_string();

        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        let owner = segments.next()?.to_string();
        let repo = segments.next()?;
        let repo = repo.strip_suffix(".git").unwrap_or(repo).to_string();
        if repo.is_empty() {
            return None;
        }

        Some(Self { host, owner, repo })
    }

    pub fn html_url(&self) -> String {
        repo_html_url(&self.host, &self.owner, &self.repo)
    }
}

pub fn repo_html_url(host: &str, owner: &str, repo: &str) -> String {
    format!("https://{}/{}/{}", host, owner, repo)
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
