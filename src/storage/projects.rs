//! Project and manifest records

use super::{from_millis, now_millis, Database};
use crate::error::{PeripheryError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default name for a manifest supplied without one
pub const DEFAULT_MANIFEST_NAME: &str = "package.json";

/// Lifecycle of the research stage for a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Complete => "complete",
            AnalysisStatus::Failed => "failed",
        }
    }

    /// Unknown or absent values read as pending
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("processing") => AnalysisStatus::Processing,
            Some("complete") => AnalysisStatus::Complete,
            Some("failed") => AnalysisStatus::Failed,
            _ => AnalysisStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub analysis_status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
}

impl Project {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: Option<String> = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            analysis_status: AnalysisStatus::parse(status.as_deref()),
            created_at: from_millis(row.get(4)?),
        })
    }
}

/// A dependency declaration document attached to a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub id: i64,
    pub project_id: String,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

fn validate_manifest(name: &str, content: &str) -> Result<()> {
    serde_json::from_str::<serde_json::Value>(content)
        .map(|_| ())
        .map_err(|source| PeripheryError::InvalidManifest {
            name: name.to_string(),
            source,
        })
}

impl Database {
    /// Create a project together with its first manifest.
    ///
    /// The manifest must parse as JSON. The project starts out in
    /// [`AnalysisStatus::Processing`] since creation is followed by analysis.
    pub fn create_project(
        &self,
        name: &str,
        description: &str,
        manifest: &str,
        manifest_name: Option<&str>,
    ) -> Result<Project> {
        let manifest_name = manifest_name.unwrap_or(DEFAULT_MANIFEST_NAME);
        validate_manifest(manifest_name, manifest)?;

        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            analysis_status: AnalysisStatus::Processing,
            created_at: Utc::now(),
        };

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO projects (id, name, description, analysis_status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &project.id,
                &project.name,
                &project.description,
                project.analysis_status.as_str(),
                project.created_at.timestamp_millis(),
            ],
        )?;
        tx.execute(
            "INSERT INTO project_manifests (project_id, name, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![&project.id, manifest_name, manifest, now_millis()],
        )?;
        tx.commit()?;

        tracing::info!("Created project {} ({})", project.name, project.id);
        Ok(project)
    }

    /// Attach another manifest to an existing project
    pub fn add_manifest(&self, project_id: &str, name: &str, content: &str) -> Result<i64> {
        validate_manifest(name, content)?;
        self.require_project(project_id)?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO project_manifests (project_id, name, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![project_id, name, content, now_millis()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All projects, newest first
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, analysis_status, created_at
             FROM projects ORDER BY created_at DESC, rowid DESC",
        )?;
        let projects = stmt
            .query_map([], Project::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let conn = self.get_conn()?;
        let project = conn
            .query_row(
                "SELECT id, name, description, analysis_status, created_at
                 FROM projects WHERE id = ?1",
                params![project_id],
                Project::from_row,
            )
            .optional()?;
        Ok(project)
    }

    /// Like [`Database::get_project`] but a missing project is an error
    pub fn require_project(&self, project_id: &str) -> Result<Project> {
        self.get_project(project_id)?
            .ok_or_else(|| PeripheryError::ProjectNotFound {
                id: project_id.to_string(),
            })
    }

    pub fn set_analysis_status(&self, project_id: &str, status: AnalysisStatus) -> Result<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE projects SET analysis_status = ?2 WHERE id = ?1",
            params![project_id, status.as_str()],
        )?;
        if updated == 0 {
            return Err(PeripheryError::ProjectNotFound {
                id: project_id.to_string(),
            });
        }
        Ok(())
    }

    /// Manifests of a project in the order they were added
    pub fn list_manifests(&self, project_id: &str) -> Result<Vec<Manifest>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, name, content, created_at
             FROM project_manifests WHERE project_id = ?1 ORDER BY id",
        )?;
        let manifests = stmt
            .query_map(params![project_id], |row| {
                Ok(Manifest {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    name: row.get(2)?,
                    content: row.get(3)?,
                    created_at: from_millis(row.get(4)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(manifests)
    }
}
