//! Additive influence totals, global per user and per user per repository
//!
//! Merges are plain additions: applying the same delta twice doubles it.
//! Exactly-once application is the workflow's job (see the step ledger).

use super::Database;
use crate::error::Result;
use crate::model::{UserInfluence, UserRepoInfluence};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Add deltas to a user's global row, inserting it on first sight.
///
/// The profile URL of the first insert is kept; later values only fill it
/// in when it was missing.
pub(crate) fn merge_user_influence(
    conn: &Connection,
    project_id: &str,
    username: &str,
    profile_url: Option<&str>,
    commits_delta: u64,
    issues_delta: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO user_influence (project_id, username, profile_url, commits, issues)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(project_id, username) DO UPDATE SET
            profile_url = COALESCE(profile_url, excluded.profile_url),
            commits = commits + excluded.commits,
            issues = issues + excluded.issues",
        params![project_id, username, profile_url, commits_delta, issues_delta],
    )?;
    Ok(())
}

/// Add deltas to a user's row for one repository
#[allow(clippy::too_many_arguments)]
pub(crate) fn merge_repo_influence(
    conn: &Connection,
    project_id: &str,
    username: &str,
    host: &str,
    owner: &str,
    repo: &str,
    commits_delta: u64,
    issues_delta: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO user_repo_influence
            (project_id, username, owner, repo, host, commits, issues)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(project_id, username, owner, repo) DO UPDATE SET
            commits = commits + excluded.commits,
            issues = issues + excluded.issues",
        params![project_id, username, owner, repo, host, commits_delta, issues_delta],
    )?;
    Ok(())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserInfluence> {
    Ok(UserInfluence {
        project_id: row.get(0)?,
        username: row.get(1)?,
        profile_url: row.get(2)?,
        commits: row.get(3)?,
        issues: row.get(4)?,
    })
}

fn repo_row(row: &Row<'_>) -> rusqlite::Result<UserRepoInfluence> {
    Ok(UserRepoInfluence {
        project_id: row.get(0)?,
        username: row.get(1)?,
        host: row.get(2)?,
        owner: row.get(3)?,
        repo: row.get(4)?,
        commits: row.get(5)?,
        issues: row.get(6)?,
    })
}

impl Database {
    pub fn merge_user_influence(
        &self,
        project_id: &str,
        username: &str,
        profile_url: Option<&str>,
        commits_delta: u64,
        issues_delta: u64,
    ) -> Result<()> {
        let conn = self.get_conn()?;
        merge_user_influence(
            &conn,
            project_id,
            username,
            profile_url,
            commits_delta,
            issues_delta,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn merge_repo_influence(
        &self,
        project_id: &str,
        username: &str,
        host: &str,
        owner: &str,
        repo: &str,
        commits_delta: u64,
        issues_delta: u64,
    ) -> Result<()> {
        let conn = self.get_conn()?;
        merge_repo_influence(
            &conn,
            project_id,
            username,
            host,
            owner,
            repo,
            commits_delta,
            issues_delta,
        )
    }

    /// Global rows, most influential (commits + issues) first
    pub fn list_influence(&self, project_id: &str) -> Result<Vec<UserInfluence>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT project_id, username, profile_url, commits, issues
             FROM user_influence WHERE project_id = ?1
             ORDER BY commits + issues DESC, username",
        )?;
        let rows = stmt
            .query_map(params![project_id], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_user_influence(
        &self,
        project_id: &str,
        username: &str,
    ) -> Result<Option<UserInfluence>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT project_id, username, profile_url, commits, issues
                 FROM user_influence WHERE project_id = ?1 AND username = ?2",
                params![project_id, username],
                user_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Per-repository rows of one user, most influential first
    pub fn list_user_repo_influence(
        &self,
        project_id: &str,
        username: &str,
    ) -> Result<Vec<UserRepoInfluence>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT project_id, username, host, owner, repo, commits, issues
             FROM user_repo_influence WHERE project_id = ?1 AND username = ?2
             ORDER BY commits + issues DESC, owner, repo",
        )?;
        let rows = stmt
            .query_map(params![project_id, username], repo_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// All contributor rows recorded for one repository
    pub fn list_repo_influence(
        &self,
        project_id: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<UserRepoInfluence>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT project_id, username, host, owner, repo, commits, issues
             FROM user_repo_influence WHERE project_id = ?1 AND owner = ?2 AND repo = ?3
             ORDER BY commits + issues DESC, username",
        )?;
        let rows = stmt
            .query_map(params![project_id, owner, repo], repo_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
