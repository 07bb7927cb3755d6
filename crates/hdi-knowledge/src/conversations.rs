//! Conversation persistence: one JSON document holding every record

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hdi_core::ChatMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("conversation file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A saved chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(title: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            messages,
            is_pinned: false,
            project_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Persistence boundary for conversations
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All records, most recently updated first
    async fn load(&self) -> Result<Vec<ConversationRecord>, StoreError>;

    /// Insert or replace by id; assigns an id when empty. Returns the stored record.
    async fn save(&self, record: ConversationRecord) -> Result<ConversationRecord, StoreError>;

    /// Remove by id; `false` when no such record existed
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

fn sorted(records: &HashMap<String, ConversationRecord>) -> Vec<ConversationRecord> {
    let mut list: Vec<ConversationRecord> = records.values().cloned().collect();
    list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
    list
}

/// Stamp `record` for storage, keeping the original creation time on update
fn prepare(
    records: &HashMap<String, ConversationRecord>,
    mut record: ConversationRecord,
) -> ConversationRecord {
    if record.id.is_empty() {
        record.id = uuid::Uuid::new_v4().to_string();
    }
    if let Some(existing) = records.get(&record.id) {
        record.created_at = existing.created_at;
    }
    record.updated_at = Utc::now();
    record
}

/// Conversations kept in memory only
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ConversationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn load(&self) -> Result<Vec<ConversationRecord>, StoreError> {
        Ok(sorted(&*self.records.read().await))
    }

    async fn save(&self, record: ConversationRecord) -> Result<ConversationRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = prepare(&records, record);
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(id).is_some())
    }
}

/// Conversations persisted to a single JSON file.
///
/// The file is read once on open and rewritten on every change through a
/// temporary file and rename, so a crash never leaves a half-written file.
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<HashMap<String, ConversationRecord>>,
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .finish()
    }
}

impl JsonFileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        let records: Vec<ConversationRecord> = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_err(e)),
        };

        info!(
            "Opened conversation store {} ({} records)",
            path.display(),
            records.len()
        );

        Ok(Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &HashMap<String, ConversationRecord>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let body = serde_json::to_vec_pretty(&sorted(records))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        debug!("Persisted {} conversations to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<ConversationRecord>, StoreError> {
        Ok(sorted(&*self.records.read().await))
    }

    async fn save(&self, record: ConversationRecord) -> Result<ConversationRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = prepare(&records, record);
        records.insert(record.id.clone(), record.clone());
        self.persist(&records).await?;
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        if records.remove(id).is_none() {
            return Ok(false);
        }
        self.persist(&records).await?;
        info!("Deleted conversation {}", id);
        Ok(true)
    }
}
