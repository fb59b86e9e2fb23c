//! Storage for the two context records the agent reads and writes
//!
//! Chat history and the calendar cache live behind [`ContextStore`] so the
//! agent never depends on a particular database.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::calendar::EventRecord;
use crate::core::{Result, Role, StewardError};

/// Oldest chat records are dropped past this many
const MAX_STORED_CHATS: usize = 500;

/// One message of chat history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatRecord {
    pub fn new(role: Role, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at,
        }
    }
}

/// Cached calendar events and when they were fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSnapshot {
    pub events: Vec<EventRecord>,
    pub fetched_at: DateTime<Utc>,
}

#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Most recent `limit` chat records, oldest first
    async fn recent_chats(&self, limit: usize) -> Result<Vec<ChatRecord>>;

    async fn append_chat(&self, record: ChatRecord) -> Result<()>;

    async fn calendar(&self) -> Result<Option<CalendarSnapshot>>;

    /// Replace the calendar cache
    async fn store_calendar(&self, snapshot: CalendarSnapshot) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ContextData {
    #[serde(default)]
    chats: Vec<ChatRecord>,
    #[serde(default)]
    calendar: Option<CalendarSnapshot>,
}

impl ContextData {
    fn recent(&self, limit: usize) -> Vec<ChatRecord> {
        let start = self.chats.len().saturating_sub(limit);
        self.chats[start..].to_vec()
    }

    fn push(&mut self, record: ChatRecord) {
        self.chats.push(record);
        if self.chats.len() > MAX_STORED_CHATS {
            let excess = self.chats.len() - MAX_STORED_CHATS;
            self.chats.drain(..excess);
        }
    }
}

/// Process-local store; contents are lost on exit
#[derive(Debug, Default)]
pub struct MemoryContextStore {
    data: Mutex<ContextData>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    async fn recent_chats(&self, limit: usize) -> Result<Vec<ChatRecord>> {
        Ok(self.data.lock().await.recent(limit))
    }

    async fn append_chat(&self, record: ChatRecord) -> Result<()> {
        self.data.lock().await.push(record);
        Ok(())
    }

    async fn calendar(&self) -> Result<Option<CalendarSnapshot>> {
        Ok(self.data.lock().await.calendar.clone())
    }

    async fn store_calendar(&self, snapshot: CalendarSnapshot) -> Result<()> {
        self.data.lock().await.calendar = Some(snapshot);
        Ok(())
    }
}

/// Store backed by a single JSON document
///
/// Every operation reads the file; writes replace it whole. A missing file
/// reads as empty.
#[derive(Debug)]
pub struct JsonFileContextStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileContextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<config_dir>/steward/context.json`
    pub fn default_path() -> PathBuf {
        crate::core::Config::config_dir().join("context.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<ContextData> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(ContextData::default()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StewardError::Other(format!(
                    "Corrupt context file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ContextData::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, data: &ContextData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(data)?;
        // Readers see either the old file or the new one, never a partial write
        let staging = self.staging_path();
        tokio::fs::write(&staging, content).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl ContextStore for JsonFileContextStore {
    async fn recent_chats(&self, limit: usize) -> Result<Vec<ChatRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.recent(limit))
    }

    async fn append_chat(&self, record: ChatRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        data.push(record);
        self.write(&data).await
    }

    async fn calendar(&self) -> Result<Option<CalendarSnapshot>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.calendar)
    }

    async fn store_calendar(&self, snapshot: CalendarSnapshot) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        data.calendar = Some(snapshot);
        self.write(&data).await
    }
}
