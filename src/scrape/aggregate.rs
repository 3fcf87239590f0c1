//! Applies one repository's contributions to the influence totals
//!
//! Commit and issue deltas go in as separate additive merges, but every merge
//! of a step commits in the same transaction as the step's ledger flag and
//! the progress counters. A step whose flag is already set is skipped whole.

use super::{RepoContributions, RepoRef, ScrapeRun};
use crate::error::{PeripheryError, Result};
use crate::model::ScrapeProgress;
use crate::storage::influence::{merge_repo_influence, merge_user_influence};
use crate::storage::progress::{complete_step, is_step_complete, read_progress};
use crate::storage::Database;
use rusqlite::{Connection, TransactionBehavior};

fn merge_deltas(
    conn: &Connection,
    project_id: &str,
    repo: &RepoRef,
    contributions: &RepoContributions,
) -> Result<()> {
    for c in &contributions.committers {
        merge_user_influence(conn, project_id, &c.login, c.profile_url.as_deref(), c.count, 0)?;
        merge_repo_influence(
            conn, project_id, &c.login, &repo.host, &repo.owner, &repo.repo, c.count, 0,
        )?;
    }

    for i in &contributions.issuers {
        merge_user_influence(conn, project_id, &i.login, i.profile_url.as_deref(), 0, i.count)?;
        merge_repo_influence(
            conn, project_id, &i.login, &repo.host, &repo.owner, &repo.repo, 0, i.count,
        )?;
    }

    Ok(())
}

/// Merge a step's deltas and mark it complete, atomically
pub fn apply_step(
    db: &Database,
    run: &ScrapeRun,
    step_index: u32,
    repo: Option<(&RepoRef, &RepoContributions)>,
) -> Result<ScrapeProgress> {
    let mut conn = db.get_conn()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if is_step_complete(&tx, &run.run_id, step_index)? {
        tracing::debug!("Step {} of run {} already applied", step_index, run.run_id);
        return read_progress(&tx, &run.project_id)?.ok_or_else(|| {
            PeripheryError::Other(anyhow::anyhow!(
                "No scrape progress row for project {}",
                run.project_id
            ))
        });
    }

    if let Some((repo, contributions)) = repo {
        merge_deltas(&tx, &run.project_id, repo, contributions)?;
    }
    let progress = complete_step(&tx, &run.project_id, &run.run_id, step_index)?;

    tx.commit()?;
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Contributor;
    use tempfile::TempDir;

    fn contributions() -> RepoContributions {
        RepoContributions {
            committers: vec![Contributor {
                login: "bob".to_string(),
                profile_url: Some("https://host/bob".to_string()),
                count: 7,
            }],
            issuers: vec![Contributor {
                login: "bob".to_string(),
                profile_url: None,
                count: 2,
            }],
            member_count: 0,
            excluded: 0,
        }
    }

    #[test]
    fn test_step_applied_exactly_once() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).unwrap();
        let project = db.create_project("web", "", "{}", None).unwrap();
        let run = ScrapeRun::new(&project.id, 0.35);
        db.begin_scrape(&project.id, &run.run_id, &["https://host/org1/foo".to_string()])
            .unwrap();

        let repo = RepoRef::parse("https://host/org1/foo").unwrap();
        let contributions = contributions();

        let first = apply_step(&db, &run, 0, Some((&repo, &contributions))).unwrap();
        let second = apply_step(&db, &run, 0, Some((&repo, &contributions))).unwrap();
        assert_eq!(first.processed_repos, 1);
        assert_eq!(second.processed_repos, 1);

        let bob = db.get_user_influence(&project.id, "bob").unwrap().unwrap();
        assert_eq!((bob.commits, bob.issues), (7, 2));
        assert_eq!(bob.profile_url.as_deref(), Some("https://host/bob"));

        let rows = db.list_repo_influence(&project.id, "org1", "foo").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].commits, rows[0].issues), (7, 2));
    }
}
