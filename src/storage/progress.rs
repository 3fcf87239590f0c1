//! Scrape progress row, step ledger and the per-project run lock
//!
//! The free functions take a plain `&Connection` so the workflow can compose
//! them with influence merges inside one transaction.

use super::{from_millis, now_millis, Database};
use crate::error::{PeripheryError, Result};
use crate::model::{percent_complete, ScrapeProgress, ScrapeStep};
use rusqlite::{params, Connection, OptionalExtension, Row};

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<ScrapeProgress> {
    Ok(ScrapeProgress {
        project_id: row.get(0)?,
        run_id: row.get(1)?,
        finished: row.get(2)?,
        total_repos: row.get(3)?,
        processed_repos: row.get(4)?,
        percent: row.get(5)?,
        updated_at: from_millis(row.get(6)?),
    })
}

fn step_from_row(row: &Row<'_>) -> rusqlite::Result<ScrapeStep> {
    Ok(ScrapeStep {
        run_id: row.get(0)?,
        step_index: row.get(1)?,
        repository_url: row.get(2)?,
        completed: row.get(3)?,
    })
}

pub(crate) fn read_progress(conn: &Connection, project_id: &str) -> Result<Option<ScrapeProgress>> {
    let progress = conn
        .query_row(
            "SELECT project_id, run_id, finished, total_repos, processed_repos, percent, updated_at
             FROM scrape_progress WHERE project_id = ?1",
            params![project_id],
            progress_from_row,
        )
        .optional()?;
    Ok(progress)
}

pub(crate) fn is_step_complete(conn: &Connection, run_id: &str, step_index: u32) -> Result<bool> {
    let completed: Option<bool> = conn
        .query_row(
            "SELECT completed FROM scrape_steps WHERE run_id = ?1 AND step_index = ?2",
            params![run_id, step_index],
            |row| row.get(0),
        )
        .optional()?;
    Ok(completed.unwrap_or(false))
}

/// Mark a ledger step complete and advance the progress counters.
///
/// A step that is already complete leaves the counters untouched, so
/// replaying the same step cannot push `processed_repos` past the real
/// count.
pub(crate) fn complete_step(
    conn: &Connection,
    project_id: &str,
    run_id: &str,
    step_index: u32,
) -> Result<ScrapeProgress> {
    let changed = conn.execute(
        "UPDATE scrape_steps SET completed = 1, completed_at = ?3
         WHERE run_id = ?1 AND step_index = ?2 AND completed = 0",
        params![run_id, step_index, now_millis()],
    )?;

    let current = read_progress(conn, project_id)?.ok_or_else(|| {
        PeripheryError::Other(anyhow::anyhow!(
            "No scrape progress row for project {}",
            project_id
        ))
    })?;

    if changed == 0 {
        tracing::debug!("Step {} of run {} was already complete", step_index, run_id);
        return Ok(current);
    }

    let processed = (current.processed_repos + 1).min(current.total_repos);
    let percent = percent_complete(processed, current.total_repos);
    conn.execute(
        "UPDATE scrape_progress SET processed_repos = ?2, percent = ?3, updated_at = ?4
         WHERE project_id = ?1",
        params![project_id, processed, percent, now_millis()],
    )?;

    Ok(ScrapeProgress {
        processed_repos: processed,
        percent,
        ..current
    })
}

impl Database {
    /// Transition a project's scrape to running and write the run's ledger.
    ///
    /// Both writes commit together, so the ledger and the progress row never
    /// disagree about which run is current. Steps of the project's earlier
    /// runs are dropped in the same transaction.
    pub fn begin_scrape(
        &self,
        project_id: &str,
        run_id: &str,
        repository_urls: &[String],
    ) -> Result<ScrapeProgress> {
        let total = repository_urls.len() as u32;
        let percent: u8 = if total == 0 { 100 } else { 0 };

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO scrape_progress
                (project_id, run_id, finished, total_repos, processed_repos, percent, updated_at)
             VALUES (?1, ?2, 0, ?3, 0, ?4, ?5)
             ON CONFLICT(project_id) DO UPDATE SET
                run_id = excluded.run_id,
                finished = 0,
                total_repos = excluded.total_repos,
                processed_repos = 0,
                percent = excluded.percent,
                updated_at = excluded.updated_at",
            params![project_id, run_id, total, percent, now_millis()],
        )?;

        tx.execute(
            "DELETE FROM scrape_steps WHERE project_id = ?1 AND run_id != ?2",
            params![project_id, run_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO scrape_steps (run_id, step_index, project_id, repository_url)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (index, url) in repository_urls.iter().enumerate() {
                stmt.execute(params![run_id, index as u32, project_id, url])?;
            }
        }

        let progress = read_progress(&tx, project_id)?.ok_or_else(|| {
            PeripheryError::Other(anyhow::anyhow!("Progress row vanished for {}", project_id))
        })?;
        tx.commit()?;

        Ok(progress)
    }

    /// Transition to finished: all repositories processed, 100 percent
    pub fn finish_scrape(&self, project_id: &str) -> Result<ScrapeProgress> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE scrape_progress
             SET finished = 1, processed_repos = total_repos, percent = 100, updated_at = ?2
             WHERE project_id = ?1",
            params![project_id, now_millis()],
        )?;
        read_progress(&conn, project_id)?.ok_or_else(|| {
            PeripheryError::Other(anyhow::anyhow!(
                "No scrape progress row for project {}",
                project_id
            ))
        })
    }

    pub fn get_progress(&self, project_id: &str) -> Result<Option<ScrapeProgress>> {
        let conn = self.get_conn()?;
        read_progress(&conn, project_id)
    }

    /// Mark one step complete outside of any larger transaction
    pub fn complete_step(
        &self,
        project_id: &str,
        run_id: &str,
        step_index: u32,
    ) -> Result<ScrapeProgress> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let progress = complete_step(&tx, project_id, run_id, step_index)?;
        tx.commit()?;
        Ok(progress)
    }

    /// Ledger of a run in step order
    pub fn run_steps(&self, run_id: &str) -> Result<Vec<ScrapeStep>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, step_index, repository_url, completed
             FROM scrape_steps WHERE run_id = ?1 ORDER BY step_index",
        )?;
        let steps = stmt
            .query_map(params![run_id], step_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(steps)
    }

    /// Take the project's run lock.
    ///
    /// Re-acquiring a lock already held by the same run succeeds, which lets a
    /// resumed run pick up a lock left behind by a crash.
    pub fn acquire_scrape_lock(&self, project_id: &str, run_id: &str) -> Result<()> {
        let conn = self.get_conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO scrape_locks (project_id, run_id, acquired_at)
             VALUES (?1, ?2, ?3)",
            params![project_id, run_id, now_millis()],
        )?;
        if inserted == 1 {
            return Ok(());
        }

        match self.scrape_lock_holder(project_id)? {
            Some(holder) if holder == run_id => Ok(()),
            _ => Err(PeripheryError::ScrapeInProgress {
                project_id: project_id.to_string(),
            }),
        }
    }

    pub fn release_scrape_lock(&self, project_id: &str, run_id: &str) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM scrape_locks WHERE project_id = ?1 AND run_id = ?2",
            params![project_id, run_id],
        )?;
        Ok(())
    }

    pub fn scrape_lock_holder(&self, project_id: &str) -> Result<Option<String>> {
        let conn = self.get_conn()?;
        let holder = conn
            .query_row(
                "SELECT run_id FROM scrape_locks WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(holder)
    }
}
