//! SQLite database management with migrations
//!
//! Provides structured storage for projects, dependency rows, scrape
//! progress, the scrape log and influence totals.

use crate::error::{PeripheryError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled connection handed out by [`Database::get_conn`]
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager with migration support
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database and apply pending migrations
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PeripheryError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        // Every pooled connection needs the pragmas, not just the first one
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        });

        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| PeripheryError::Pool(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };

        db.migrate()?;

        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<DbConn> {
        self.pool
            .get()
            .map_err(|e| PeripheryError::Pool(format!("Failed to get connection: {}", e)))
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    CREATE TABLE projects (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        analysis_status TEXT,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE project_manifests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id TEXT NOT NULL,
        name TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_manifests_project ON project_manifests(project_id);

    -- Dependency rows: replaced wholesale per analysis, then patched with scores
    CREATE TABLE dependencies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id TEXT NOT NULL,
        package_name TEXT NOT NULL,
        version_spec TEXT NOT NULL,
        repository_url TEXT,
        relevance REAL,
        niche REAL,
        signal REAL,
        UNIQUE (project_id, package_name),
        CHECK (
            (relevance IS NULL AND niche IS NULL AND signal IS NULL)
            OR (relevance IS NOT NULL AND niche IS NOT NULL AND signal IS NOT NULL)
        ),
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_dependencies_project ON dependencies(project_id);

    CREATE TABLE scrape_progress (
        project_id TEXT PRIMARY KEY,
        run_id TEXT,
        finished BOOLEAN NOT NULL,
        total_repos INTEGER NOT NULL DEFAULT 0,
        processed_repos INTEGER NOT NULL DEFAULT 0,
        percent INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL,
        CHECK (processed_repos >= 0 AND processed_repos <= total_repos),
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    -- Step ledger: one row per qualifying repository of a run
    CREATE TABLE scrape_steps (
        run_id TEXT NOT NULL,
        step_index INTEGER NOT NULL,
        project_id TEXT NOT NULL,
        repository_url TEXT NOT NULL,
        completed BOOLEAN NOT NULL DEFAULT 0,
        completed_at INTEGER,
        PRIMARY KEY (run_id, step_index),
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    CREATE TABLE scrape_locks (
        project_id TEXT PRIMARY KEY,
        run_id TEXT NOT NULL,
        acquired_at INTEGER NOT NULL,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    CREATE TABLE scrape_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id TEXT NOT NULL,
        level TEXT NOT NULL,
        message TEXT NOT NULL,
        step TEXT,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_scrape_logs_project ON scrape_logs(project_id, id);

    CREATE TABLE user_influence (
        project_id TEXT NOT NULL,
        username TEXT NOT NULL,
        profile_url TEXT,
        commits INTEGER NOT NULL CHECK (commits >= 0),
        issues INTEGER NOT NULL CHECK (issues >= 0),
        PRIMARY KEY (project_id, username),
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    CREATE TABLE user_repo_influence (
        project_id TEXT NOT NULL,
        username TEXT NOT NULL,
        owner TEXT NOT NULL,
        repo TEXT NOT NULL,
        host TEXT NOT NULL,
        commits INTEGER NOT NULL CHECK (commits >= 0),
        issues INTEGER NOT NULL CHECK (issues >= 0),
        PRIMARY KEY (project_id, username, owner, repo),
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_user_repo_influence_user ON user_repo_influence(project_id, username);
    "#,
];
