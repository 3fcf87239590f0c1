//! Per-repository contribution fetch with org-member exclusion

use super::RepoRef;
use crate::github::HostingApi;
use crate::model::Contributor;
use std::collections::HashSet;

/// Contributions of one repository after public org members were removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoContributions {
    pub committers: Vec<Contributor>,
    pub issuers: Vec<Contributor>,
    /// Size of the public member list the exclusion used
    pub member_count: usize,
    /// Committer and issuer entries removed as org members
    pub excluded: usize,
}

impl RepoContributions {
    /// Exclusions are only reported when a member list was available
    pub fn should_report_exclusions(&self) -> bool {
        self.member_count > 0 && self.excluded > 0
    }
}

/// Fetch members, committers and issuers concurrently, then drop members
pub async fn fetch_repo_contributions(hosting: &dyn HostingApi, repo: &RepoRef) -> RepoContributions {
    let (members, committers, issuers) = tokio::join!(
        hosting.org_public_members(&repo.owner),
        hosting.commit_contributors(&repo.owner, &repo.repo),
        hosting.issue_creators(&repo.owner, &repo.repo),
    );

    let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();
    let before = committers.len() + issuers.len();

    let committers: Vec<Contributor> = committers
        .into_iter()
        .filter(|c| !member_set.contains(c.login.as_str()))
        .collect();
    let issuers: Vec<Contributor> = issuers
        .into_iter()
        .filter(|c| !member_set.contains(c.login.as_str()))
        .collect();

    let excluded = before - (committers.len() + issuers.len());
    tracing::debug!(
        "{}: {} committers, {} issuers, {} excluded",
        repo,
        committers.len(),
        issuers.len(),
        excluded
    );

    RepoContributions {
        committers,
        issuers,
        member_count: members.len(),
        excluded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticHosting;

    fn contributor(login: &str, count: u64) -> Contributor {
        Contributor {
            login: login.to_string(),
            profile_url: None,
            count,
        }
    }

    #[async_trait]
    impl HostingApi for StaticHosting {
        fn supports_host(&self, host: &str) -> bool {
            host == "host"
        }

        async fn org_public_members(&self, _org: &str) -> Vec<String> {
            vec!["alice".to_string()]
        }

        async fn commit_contributors(&self, _owner: &str, _repo: &str) -> Vec<Contributor> {
            vec![contributor("alice", 10), contributor("bob", 4)]
        }

        async fn issue_creators(&self, _owner: &str, _repo: &str) -> Vec<Contributor> {
            vec![contributor("alice", 1), contributor("carol", 2)]
        }
    }

    #[tokio::test]
    async fn test_members_removed_from_both_lists() {
        let repo = RepoRef::parse("https://host/org1/foo").unwrap();
        let fetched = fetch_repo_contributions(&StaticHosting, &repo).await;

        assert_eq!(fetched.committers, vec![contributor("bob", 4)]);
        assert_eq!(fetched.issuers, vec![contributor("carol", 2)]);
        assert_eq!(fetched.excluded, 2);
        assert!(fetched.should_report_exclusions());
    }
}
