//! Hosting-platform REST client
//!
//! Every call is best-effort: a transport error, a non-success status or an
//! undecodable body yields an empty list and a warning, never an error.

use crate::config::GithubConfig;
use crate::error::{PeripheryError, Result};
use crate::model::Contributor;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

/// Contribution data of one hosted repository
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Whether repository URLs on `host` belong to this platform
    fn supports_host(&self, host: &str) -> bool;

    /// Publicly visible members of an organization (or empty for a user account)
    async fn org_public_members(&self, org: &str) -> Vec<String>;

    /// Commit contributors with their commit counts
    async fn commit_contributors(&self, owner: &str, repo: &str) -> Vec<Contributor>;

    /// Issue creators with the number of issues each opened
    async fn issue_creators(&self, owner: &str, repo: &str) -> Vec<Contributor>;
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: Option<String>,
    html_url: Option<String>,
    contributions: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    user: Option<ApiUser>,
}

pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    web_host: String,
    per_page: u32,
    headers: HeaderMap,
}

impl GithubClient {
    pub fn new(client: reqwest::Client, config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| {
                PeripheryError::Config(format!("Invalid github.user_agent: {}", e))
            })?,
        );

        match std::env::var(&config.token_env) {
            Ok(token) if !token.trim().is_empty() => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                    .map_err(|e| PeripheryError::Config(format!("Invalid API token: {}", e)))?;
                headers.insert(AUTHORIZATION, value);
            }
            _ => tracing::debug!("{} not set; using unauthenticated requests", config.token_env),
        }

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            web_host: config.web_host.trim().to_string(),
            per_page: config.per_page,
            headers,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.api_base, path);
        let response = self
            .client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeripheryError::Other(anyhow::anyhow!(
                "GET {} returned {}",
                path,
                status
            )));
        }

        Ok(response.json::<T>().await?)
    }

    /// Fetch a list, degrading to empty on any failure
    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Vec<T> {
        match self.get_json::<Vec<T>>(path).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Hosting API call failed, treating as empty: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl HostingApi for GithubClient {
    fn supports_host(&self, host: &str) -> bool {
        host.eq_ignore_ascii_case(&self.web_host)
    }

    async fn org_public_members(&self, org: &str) -> Vec<String> {
        let path = format!("/orgs/{}/members?per_page={}", org, self.per_page);
        self.get_list::<ApiUser>(&path)
            .await
            .into_iter()
            .filter_map(|user| user.login)
            .collect()
    }

    async fn commit_contributors(&self, owner: &str, repo: &str) -> Vec<Contributor> {
        let path = format!(
            "/repos/{}/{}/contributors?per_page={}&anon=false",
            owner, repo, self.per_page
        );
        contributors_from_users(self.get_list::<ApiUser>(&path).await)
    }

    async fn issue_creators(&self, owner: &str, repo: &str) -> Vec<Contributor> {
        let path = format!(
            "/repos/{}/{}/issues?state=all&per_page={}",
            owner, repo, self.per_page
        );
        group_issue_creators(self.get_list::<ApiIssue>(&path).await)
    }
}

/// Entries without a login are dropped; a missing count is zero
fn contributors_from_users(users: Vec<ApiUser>) -> Vec<Contributor> {
    users
        .into_iter()
        .filter_map(|user| {
            Some(Contributor {
                login: user.login?,
                profile_url: user.html_url,
                count: user.contributions.unwrap_or(0),
            })
        })
        .collect()
}

/// Count issues per creator in first-seen order, keeping the first profile URL
fn group_issue_creators(issues: Vec<ApiIssue>) -> Vec<Contributor> {
    let mut creators: Vec<Contributor> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for user in issues.into_iter().filter_map(|issue| issue.user) {
        let Some(login) = user.login else { continue };
        match index.get(&login) {
            Some(&i) => creators[i].count += 1,
            None => {
                index.insert(login.clone(), creators.len());
                creators.push(Contributor {
                    login,
                    profile_url: user.html_url,
                    count: 1,
                });
            }
        }
    }

    creators
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contributors_drop_anonymous_entries() {
        let users: Vec<ApiUser> = serde_json::from_str(
            r#"[
                {"login": "bob", "html_url": "https://host/bob", "contributions": 12},
                {"type": "Anonymous", "contributions": 40},
                {"login": "carol"}
            ]"#,
        )
        .unwrap();

        let contributors = contributors_from_users(users);
        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors[0].count, 12);
        assert_eq!(contributors[1].login, "carol");
        assert_eq!(contributors[1].count, 0);
        assert_eq!(contributors[1].profile_url, None);
    }

    #[test]
    fn test_issue_creators_grouped_in_first_seen_order() {
        let issues: Vec<ApiIssue> = serde_json::from_str(
            r#"[
                {"user": {"login": "dave", "html_url": "https://host/dave"}},
                {"user": {"login": "erin", "html_url": "https://host/erin"}},
                {"user": {"login": "dave", "html_url": "https://other/dave"}},
                {"user": null},
                {"title": "no user"}
            ]"#,
        )
        .unwrap();

        let creators = group_issue_creators(issues);
        let summary: Vec<_> = creators
            .iter()
            .map(|c| (c.login.as_str(), c.count, c.profile_url.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("dave", 2, Some("https://host/dave")),
                ("erin", 1, Some("https://host/erin")),
            ]
        );
    }

    #[test]
    fn test_client_headers() {
        let config = GithubConfig {
            token_env: "PERIPHERY_TEST_UNSET_TOKEN_VAR".to_string(),
            ..crate::config::Config::default().github
        };
        let client = GithubClient::new(reqwest::Client::new(), &config).unwrap();
        assert_eq!(client.headers[ACCEPT], "application/vnd.github+json");
        assert_eq!(client.headers[USER_AGENT], "periphery-app");
        assert!(!client.headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_supports_only_configured_web_host() {
        let client =
            GithubClient::new(reqwest::Client::new(), &crate::config::Config::default().github)
                .unwrap();
        assert!(client.supports_host("github.com"));
        assert!(client.supports_host("GitHub.com"));
        assert!(!client.supports_host("gitlab.com"));
        assert!(!client.supports_host("github.com.evil.example"));
    }
}
