//! Local filesystem implementation of the ProjectStore trait
//!
//! Layout under the base path:
//! `{project}/styles.json` and `{project}/versions/{seq:08}_{id}.json`.

use crate::store::{
    ProjectStore, SavedVersion, StoreError, StyleMap, VersionInfo, new_version_info, validate_id,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Local filesystem-backed implementation of ProjectStore
#[derive(Clone)]
pub struct LocalFileStore {
    base_path: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct VersionRecord {
    seq: u64,
    #[serde(flatten)]
    version: SavedVersion,
}

impl LocalFileStore {
    /// Create a new local file store
    ///
    /// The base_path will be created if it doesn't exist.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StoreError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        info!("Initialized LocalFileStore at {:?}", base_path);
        Ok(Self { base_path })
    }

    fn project_dir(&self, project_id: &str) -> Result<PathBuf, StoreError> {
        validate_id(project_id)?;
        Ok(self.base_path.join(project_id))
    }

    fn versions_dir(&self, project_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.project_dir(project_id)?.join("versions"))
    }

    /// Write data atomically using a temporary file
    fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, data)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Read every version record of a project, newest first
    fn read_records(&self, project_id: &str) -> Result<Vec<VersionRecord>, StoreError> {
        let dir = self.versions_dir(project_id)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let data = fs::read(&path)?;
            match serde_json::from_slice::<VersionRecord>(&data) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable version file {:?}: {}", path, e),
            }
        }

        records.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(records)
    }

    fn save_version_blocking(
        &self,
        project_id: &str,
        label: Option<&str>,
        content: &str,
    ) -> Result<VersionInfo, StoreError> {
        let records = self.read_records(project_id)?;
        let info = new_version_info(project_id, label, content);

        if let Some(latest) = records.first() {
            if latest.version.info.content_hash == info.content_hash {
                debug!("Version unchanged for {}, reusing {}", project_id, latest.version.info.id);
                return Ok(latest.version.info.clone());
            }
        }

        let seq = records.first().map(|r| r.seq + 1).unwrap_or(1);
        let path = self
            .versions_dir(project_id)?
            .join(format!("{:08}_{}.json", seq, info.id));
        let record = VersionRecord {
            seq,
            version: SavedVersion {
                info: info.clone(),
                content: content.to_string(),
            },
        };
        Self::write_atomic(&path, &serde_json::to_vec(&record)?)?;

        info!("Saved version {} for {} ({} bytes)", info.id, project_id, info.size);
        Ok(info)
    }
}

#[async_trait::async_trait]
impl ProjectStore for LocalFileStore {
    async fn load_styles(&self, project_id: &str) -> Result<Option<StyleMap>, StoreError> {
        let path = self.project_dir(project_id)?.join("styles.json");
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_styles(&self, project_id: &str, styles: &StyleMap) -> Result<(), StoreError> {
        let path = self.project_dir(project_id)?.join("styles.json");
        let data = serde_json::to_vec_pretty(styles)?;

        // Use tokio::task::spawn_blocking for filesystem I/O
        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &data))
            .await
            .map_err(|e| StoreError::Storage(Box::new(e)))??;

        debug!("Saved style map for {} ({} selectors)", project_id, styles.len());
        Ok(())
    }

    async fn save_version(
        &self,
        project_id: &str,
        label: Option<&str>,
        content: &str,
    ) -> Result<VersionInfo, StoreError> {
        let store = self.clone();
        let project_id = project_id.to_string();
        let label = label.map(str::to_string);
        let content = content.to_string();

        tokio::task::spawn_blocking(move || {
            store.save_version_blocking(&project_id, label.as_deref(), &content)
        })
        .await
        .map_err(|e| StoreError::Storage(Box::new(e)))?
    }

    async fn list_versions(&self, project_id: &str) -> Result<Vec<VersionInfo>, StoreError> {
        let store = self.clone();
        let project_id = project_id.to_string();

        let records = tokio::task::spawn_blocking(move || store.read_records(&project_id))
            .await
            .map_err(|e| StoreError::Storage(Box::new(e)))??;

        Ok(records.into_iter().map(|r| r.version.info).collect())
    }

    async fn get_version(
        &self,
        project_id: &str,
        version_id: &str,
    ) -> Result<Option<SavedVersion>, StoreError> {
        validate_id(version_id)?;
        let store = self.clone();
        let project_id = project_id.to_string();

        let records = tokio::task::spawn_blocking(move || store.read_records(&project_id))
            .await
            .map_err(|e| StoreError::Storage(Box::new(e)))??;

        Ok(records
            .into_iter()
            .map(|r| r.version)
            .find(|v| v.info.id == version_id))
    }

    fn storage_type(&self) -> &str {
        "local"
    }
}
