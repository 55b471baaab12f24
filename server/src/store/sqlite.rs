//! SQLite implementation of the ProjectStore trait

use crate::store::{
    ProjectStore, SavedVersion, StoreError, StyleMap, VersionInfo, new_version_info, validate_id,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// SQLite-backed implementation of ProjectStore
pub struct SqliteProjectStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProjectStore {
    /// Create a new SQLite project store
    ///
    /// If the database doesn't exist, it will be created with the required schema.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;

        // One style map per project, stored as JSON
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS project_styles (
                project_id TEXT PRIMARY KEY,
                styles_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        // Saved versions; rowid gives a stable newest-first order
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS versions (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                label TEXT,
                content_hash TEXT NOT NULL,
                size INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_versions_project ON versions(project_id)",
            [],
        )?;

        info!("Project store database schema initialized");
        Ok(())
    }

    fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StoreError::Database(format!("Invalid timestamp {}: {}", raw, e)))
    }

    fn latest_version(
        conn: &Connection,
        project_id: &str,
    ) -> Result<Option<VersionInfo>, StoreError> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, label, content_hash, size, created_at
            FROM versions
            WHERE project_id = ?1
            ORDER BY rowid DESC
            LIMIT 1
            "#,
        )?;
        let mut rows = stmt.query_map(params![project_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        match rows.next() {
            Some(Ok((id, label, content_hash, size, created_at))) => Ok(Some(VersionInfo {
                id,
                project_id: project_id.to_string(),
                label,
                content_hash,
                size: size as u64,
                created_at: Self::parse_timestamp(&created_at)?,
            })),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl ProjectStore for SqliteProjectStore {
    async fn load_styles(&self, project_id: &str) -> Result<Option<StyleMap>, StoreError> {
        validate_id(project_id)?;
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT styles_json FROM project_styles WHERE project_id = ?1")?;
        let mut rows = stmt.query_map(params![project_id], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(Ok(json)) => Ok(Some(serde_json::from_str(&json)?)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    async fn save_styles(&self, project_id: &str, styles: &StyleMap) -> Result<(), StoreError> {
        validate_id(project_id)?;
        let json = serde_json::to_string(styles)?;
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO project_styles (project_id, styles_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(project_id) DO UPDATE SET
                styles_json = ?2,
                updated_at = ?3
            "#,
            params![project_id, json, Utc::now().to_rfc3339()],
        )?;

        debug!("Saved style map for {} ({} selectors)", project_id, styles.len());
        Ok(())
    }

    async fn save_version(
        &self,
        project_id: &str,
        label: Option<&str>,
        content: &str,
    ) -> Result<VersionInfo, StoreError> {
        validate_id(project_id)?;
        let info = new_version_info(project_id, label, content);
        let conn = self.lock()?;

        if let Some(latest) = Self::latest_version(&conn, project_id)? {
            if latest.content_hash == info.content_hash {
                debug!("Version unchanged for {}, reusing {}", project_id, latest.id);
                return Ok(latest);
            }
        }

        conn.execute(
            r#"
            INSERT INTO versions (id, project_id, label, content_hash, size, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                info.id,
                info.project_id,
                info.label,
                info.content_hash,
                info.size as i64,
                content,
                info.created_at.to_rfc3339()
            ],
        )?;

        info!("Saved version {} for {} ({} bytes)", info.id, project_id, info.size);
        Ok(info)
    }

    async fn list_versions(&self, project_id: &str) -> Result<Vec<VersionInfo>, StoreError> {
        validate_id(project_id)?;
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, label, content_hash, size, created_at
            FROM versions
            WHERE project_id = ?1
            ORDER BY rowid DESC
            "#,
        )?;

        let rows = stmt
            .query_map(params![project_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, label, content_hash, size, created_at)| {
                Ok(VersionInfo {
                    id,
                    project_id: project_id.to_string(),
                    label,
                    content_hash,
                    size: size as u64,
                    created_at: Self::parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    async fn get_version(
        &self,
        project_id: &str,
        version_id: &str,
    ) -> Result<Option<SavedVersion>, StoreError> {
        validate_id(project_id)?;
        validate_id(version_id)?;
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT label, content_hash, size, created_at, content
            FROM versions
            WHERE project_id = ?1 AND id = ?2
            "#,
        )?;
        let mut rows = stmt.query_map(params![project_id, version_id], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        match rows.next() {
            Some(Ok((label, content_hash, size, created_at, content))) => Ok(Some(SavedVersion {
                info: VersionInfo {
                    id: version_id.to_string(),
                    project_id: project_id.to_string(),
                    label,
                    content_hash,
                    size: size as u64,
                    created_at: Self::parse_timestamp(&created_at)?,
                },
                content,
            })),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    fn storage_type(&self) -> &str {
        "sqlite"
    }
}
