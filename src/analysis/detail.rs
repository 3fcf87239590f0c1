use crate::model::{UserInfluence, UserRepoInfluence};
use crate::scrape::repo_html_url;
use serde::Serialize;

/// One repository a contributor has influence in, with browse links
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRepoDetail {
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub commits: u64,
    pub issues: u64,
    pub repo_url: String,
    pub commits_url: String,
    pub issues_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDetail {
    pub username: String,
    pub profile_url: Option<String>,
    pub commits: u64,
    pub issues: u64,
    pub repos: Vec<UserRepoDetail>,
    pub affected_repos: usize,
    pub total_relevant_repos: usize,
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

impl UserDetail {
    pub(crate) fn build(
        username: &str,
        global: Option<UserInfluence>,
        rows: Vec<UserRepoInfluence>,
        total_relevant_repos: usize,
    ) -> Self {
        let user = encode(username);
        let mut repos: Vec<UserRepoDetail> = rows
            .into_iter()
            .map(|row| {
                let repo_url = repo_html_url(&row.host, &row.owner, &row.repo);
                UserRepoDetail {
                    commits_url: format!("{}/commits?author={}", repo_url, user),
                    issues_url: format!("{}/issues?q=author%3A{}", repo_url, user),
                    repo_url,
                    host: row.host,
                    owner: row.owner,
                    repo: row.repo,
                    commits: row.commits,
                    issues: row.issues,
                }
            })
            .collect();
        repos.sort_by(|a, b| (b.commits + b.issues).cmp(&(a.commits + a.issues)));

        let (profile_url, commits, issues) = match global {
            Some(g) => (g.profile_url, g.commits, g.issues),
            None => (None, 0, 0),
        };

        Self {
            username: username.to_string(),
            profile_url,
            commits,
            issues,
            affected_repos: repos.len(),
            repos,
            total_relevant_repos,
        }
    }
}
