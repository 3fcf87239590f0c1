//! Append-only scrape log

use super::{from_millis, now_millis, Database};
use crate::error::Result;
use crate::model::{LogEntry, LogLevel};
use rusqlite::params;

impl Database {
    /// Append one entry; entries are never updated or deleted
    pub fn append_log(
        &self,
        project_id: &str,
        level: LogLevel,
        message: &str,
        step: Option<&str>,
    ) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO scrape_logs (project_id, level, message, step, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![project_id, level.as_str(), message, step, now_millis()],
        )?;

        tracing::trace!("[{}] {}: {}", project_id, level, message);
        Ok(())
    }

    /// Most recent entries first, at most `limit` of them
    pub fn list_logs(&self, project_id: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, level, message, step, created_at
             FROM scrape_logs WHERE project_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![project_id, limit as i64], |row| {
                let level: String = row.get(2)?;
                Ok(LogEntry {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    level: LogLevel::parse(&level),
                    message: row.get(3)?,
                    step: row.get(4)?,
                    created_at: from_millis(row.get(5)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}
