//! Persistent storage for per-project editor data
//!
//! Two things are persisted: the style map written by visual edits
//! (`selector -> property -> value`) and saved document versions. Callers
//! treat storage as best-effort; failures are logged, never shown as hard
//! errors in the editor.

pub mod local;
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// `selector -> property -> value`
pub type StyleMap = BTreeMap<String, BTreeMap<String, String>>;

/// Error type for storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Metadata for one saved document version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub id: String,
    pub project_id: String,
    pub label: Option<String>,
    /// SHA-256 of the document text
    pub content_hash: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// A saved version together with its document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedVersion {
    #[serde(flatten)]
    pub info: VersionInfo,
    pub content: String,
}

/// Storage backend for style maps and document versions
#[async_trait::async_trait]
pub trait ProjectStore: Send + Sync {
    /// Load the persisted style map, `None` if nothing was ever saved
    async fn load_styles(&self, project_id: &str) -> Result<Option<StyleMap>, StoreError>;

    /// Replace the persisted style map
    async fn save_styles(&self, project_id: &str, styles: &StyleMap) -> Result<(), StoreError>;

    /// Save the document as a new version.
    ///
    /// Saving text identical to the latest version returns that version
    /// instead of creating a duplicate.
    async fn save_version(
        &self,
        project_id: &str,
        label: Option<&str>,
        content: &str,
    ) -> Result<VersionInfo, StoreError>;

    /// All versions of a project, newest first
    async fn list_versions(&self, project_id: &str) -> Result<Vec<VersionInfo>, StoreError>;

    async fn get_version(
        &self,
        project_id: &str,
        version_id: &str,
    ) -> Result<Option<SavedVersion>, StoreError>;

    /// Storage type identifier (e.g., "sqlite", "local")
    fn storage_type(&self) -> &str;
}

/// SHA-256 of a document, hex encoded
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Project and version ids end up in file names and URLs
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

pub(crate) fn new_version_info(project_id: &str, label: Option<&str>, content: &str) -> VersionInfo {
    VersionInfo {
        id: uuid::Uuid::new_v4().simple().to_string(),
        project_id: project_id.to_string(),
        label: label.map(str::to_string),
        content_hash: content_hash(content),
        size: content.len() as u64,
        created_at: Utc::now(),
    }
}
