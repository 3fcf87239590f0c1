//! Dependency rows: replaced wholesale per analysis run, then patched with scores

use super::Database;
use crate::error::Result;
use crate::model::{Dependency, DependencyScores, ResolvedDependency};
use rusqlite::{params, Row};
use std::collections::HashMap;

fn dependency_from_row(row: &Row<'_>) -> rusqlite::Result<Dependency> {
    let relevance: Option<f64> = row.get(5)?;
    let niche: Option<f64> = row.get(6)?;
    let signal: Option<f64> = row.get(7)?;
    let scores = match (relevance, niche, signal) {
        (Some(relevance), Some(niche), Some(signal)) => Some(DependencyScores {
            relevance,
            niche,
            signal,
        }),
        _ => None,
    };

    Ok(Dependency {
        id: row.get(0)?,
        project_id: row.get(1)?,
        package_name: row.get(2)?,
        version_spec: row.get(3)?,
        repository_url: row.get(4)?,
        scores,
    })
}

const SELECT_DEPENDENCIES: &str = "SELECT id, project_id, package_name, version_spec, repository_url,
        relevance, niche, signal
 FROM dependencies WHERE project_id = ?1";

impl Database {
    /// Delete the project's dependency rows and insert `deps` in order
    pub fn replace_dependencies(
        &self,
        project_id: &str,
        deps: &[ResolvedDependency],
    ) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM dependencies WHERE project_id = ?1",
            params![project_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO dependencies (project_id, package_name, version_spec, repository_url)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for dep in deps {
                stmt.execute(params![
                    project_id,
                    &dep.package_name,
                    &dep.version_spec,
                    dep.repository_url.as_deref(),
                ])?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            "Replaced {} dependency rows with {} for project {}",
            removed,
            deps.len(),
            project_id
        );
        Ok(())
    }

    /// Patch scores onto rows that have both a score and a repository URL.
    ///
    /// Rows without a matching score are left unscored. Returns the number
    /// of rows patched.
    pub fn update_dependency_scores(
        &self,
        project_id: &str,
        scores: &HashMap<String, DependencyScores>,
    ) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut patched = 0;

        {
            let mut stmt = tx.prepare(
                "UPDATE dependencies SET relevance = ?3, niche = ?4, signal = ?5
                 WHERE project_id = ?1 AND package_name = ?2 AND repository_url IS NOT NULL",
            )?;
            for (name, s) in scores {
                patched += stmt.execute(params![
                    project_id,
                    name,
                    s.relevance,
                    s.niche,
                    s.signal
                ])?;
            }
        }

        tx.commit()?;
        Ok(patched)
    }

    /// Dependency rows in the order they were enumerated
    pub fn dependencies_in_order(&self, project_id: &str) -> Result<Vec<Dependency>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_DEPENDENCIES))?;
        let deps = stmt
            .query_map(params![project_id], dependency_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(deps)
    }

    /// Dependency rows sorted by signal, highest first, unscored last
    pub fn list_dependencies(&self, project_id: &str) -> Result<Vec<Dependency>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY signal IS NULL, signal DESC, id",
            SELECT_DEPENDENCIES
        ))?;
        let deps = stmt
            .query_map(params![project_id], dependency_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolved(name: &str, url: Option<&str>) -> ResolvedDependency {
        ResolvedDependency {
            package_name: name.to_string(),
            version_spec: "^1.0.0".to_string(),
            repository_url: url.map(str::to_string),
        }
    }

    #[test]
    fn test_replace_is_wholesale() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).unwrap();
        let project = db.create_project("web", "", "{}", None).unwrap();

        db.replace_dependencies(&project.id, &[resolved("a", None), resolved("b", None)])
            .unwrap();
        db.replace_dependencies(&project.id, &[resolved("c", None)])
            .unwrap();

        let names: Vec<_> = db
            .dependencies_in_order(&project.id)
            .unwrap()
            .into_iter()
            .map(|d| d.package_name)
            .collect();
        assert_eq!(names, vec!["c"]);
    }

    #[test]
    fn test_scores_only_patch_rows_with_repository() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).unwrap();
        let project = db.create_project("web", "", "{}", None).unwrap();

        db.replace_dependencies(
            &project.id,
            &[
                resolved("low", Some("https://host/o/low")),
                resolved("nourl", None),
                resolved("high", Some("https://host/o/high")),
                resolved("unscored", Some("https://host/o/unscored")),
            ],
        )
        .unwrap();

        let scores = HashMap::from([
            ("low".to_string(), DependencyScores::new(0.2, 0.2)),
            ("nourl".to_string(), DependencyScores::new(1.0, 1.0)),
            ("high".to_string(), DependencyScores::new(0.9, 0.9)),
        ]);
        let patched = db.update_dependency_scores(&project.id, &scores).unwrap();
        assert_eq!(patched, 2);

        let listed = db.list_dependencies(&project.id).unwrap();
        let names: Vec<_> = listed.iter().map(|d| d.package_name.as_str()).collect();
        assert_eq!(names, vec!["high", "low", "nourl", "unscored"]);
        assert!(listed[2].scores.is_none());
        assert!(listed[3].scores.is_none());
    }
}
