//! Durable memory records and the persisted dialogue slot
//!
//! The memory document is a flat JSON object: entity keys map to records and
//! `_`-prefixed keys carry store metadata and the tracker snapshot. The context
//! document is a JSON array of `{role, content}`. Both are rewritten whole on
//! every change; missing or corrupt documents load as empty.

use crate::error::{MemoryError, Result};
use crate::storage_backend::{DocumentBackend, JsonFileBackend};
use crate::trackers::{EntityFrequency, SentimentHistory, TrackerSnapshot};
use crate::types::{is_reserved_key, ChatMessage, MemoryRecord, StoreMetadata};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

const MEMORY_DOC: &str = "memory";
const CONTEXT_DOC: &str = "context";

const LAST_UPDATED_KEY: &str = "_last_updated";
const ENTITY_FREQUENCY_KEY: &str = "_entity_frequency";
const THEMES_KEY: &str = "_themes";
const SENTIMENT_HISTORY_KEY: &str = "_sentiment_history";

/// Memory store: sole writer of the on-disk representation
pub struct MemoryStore {
    backend: Arc<dyn DocumentBackend>,
    records: IndexMap<String, MemoryRecord>,
    last_updated: Option<DateTime<Utc>>,
    trackers: TrackerSnapshot,
    context: Vec<ChatMessage>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("backend", &self.backend.backend_name())
            .field("records", &self.records.len())
            .field("context", &self.context.len())
            .finish()
    }
}

impl MemoryStore {
    /// Load both documents from `backend`
    pub async fn open(backend: Arc<dyn DocumentBackend>) -> Result<Self> {
        let mut store = Self {
            backend,
            records: IndexMap::new(),
            last_updated: None,
            trackers: TrackerSnapshot::default(),
            context: Vec::new(),
        };

        if let Some(body) = store.backend.read(MEMORY_DOC).await? {
            store.load_memory_document(&body);
        }

        if let Some(body) = store.backend.read(CONTEXT_DOC).await? {
            match serde_json::from_str::<Vec<ChatMessage>>(&body) {
                Ok(context) => store.context = context,
                Err(e) => {
                    tracing::warn!("Context document is corrupt, starting empty: {}", e);
                }
            }
        }

        tracing::debug!(
            backend = store.backend.backend_name(),
            records = store.records.len(),
            context = store.context.len(),
            "Memory store opened"
        );

        Ok(store)
    }

    /// Open a JSON-file store in `dir`
    pub async fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(Arc::new(JsonFileBackend::new(dir.as_ref()))).await
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    // ─── Records ──────────────────────────────────────────────────────────

    /// Overwrite the record for `key` and persist
    pub async fn upsert(&mut self, key: &str, record: MemoryRecord) -> Result<()> {
        if key.is_empty() {
            return Err(MemoryError::Validation("memory key is empty".to_string()));
        }
        if is_reserved_key(key) {
            return Err(MemoryError::Validation(format!(
                "memory key '{key}' uses the reserved metadata prefix"
            )));
        }

        self.records.insert(key.to_string(), record);
        self.last_updated = Some(Utc::now());
        self.persist_memory().await
    }

    pub fn get(&self, key: &str) -> Option<&MemoryRecord> {
        self.records.get(key)
    }

    /// Every record in the document. Entries loaded under reserved keys are
    /// included; callers skip them.
    pub fn get_all(&self) -> &IndexMap<String, MemoryRecord> {
        &self.records
    }

    pub fn metadata(&self) -> StoreMetadata {
        StoreMetadata {
            total_entries: self.records.keys().filter(|k| !is_reserved_key(k)).count(),
            last_updated: self.last_updated,
        }
    }

    /// Remove every record and tracker value and persist the empty document
    pub async fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.last_updated = None;
        self.trackers = TrackerSnapshot::default();
        self.persist_memory().await
    }

    // ─── Trackers ─────────────────────────────────────────────────────────

    pub fn trackers(&self) -> &TrackerSnapshot {
        &self.trackers
    }

    pub async fn save_trackers(&mut self, snapshot: TrackerSnapshot) -> Result<()> {
        self.trackers = snapshot;
        self.persist_memory().await
    }

    // ─── Context ──────────────────────────────────────────────────────────

    pub async fn save_context(&mut self, context: &[ChatMessage]) -> Result<()> {
        let body = serde_json::to_string_pretty(context)?;
        self.backend.write(CONTEXT_DOC, &body).await?;
        self.context = context.to_vec();
        Ok(())
    }

    pub fn load_context(&self) -> Vec<ChatMessage> {
        self.context.clone()
    }

    pub fn has_context(&self) -> bool {
        !self.context.is_empty()
    }

    pub async fn clear_context(&mut self) -> Result<()> {
        self.save_context(&[]).await
    }

    // ─── Document encoding ────────────────────────────────────────────────

    fn load_memory_document(&mut self, body: &str) {
        let object = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                tracing::warn!("Memory document is not a JSON object, starting empty");
                return;
            }
            Err(e) => {
                tracing::warn!("Memory document is corrupt, starting empty: {}", e);
                return;
            }
        };

        for (key, value) in object {
            match key.as_str() {
                LAST_UPDATED_KEY => {
                    self.last_updated = serde_json::from_value(value).ok();
                }
                ENTITY_FREQUENCY_KEY => {
                    self.trackers.entity_frequency =
                        serde_json::from_value::<EntityFrequency>(value).unwrap_or_default();
                }
                THEMES_KEY => {
                    self.trackers.themes = serde_json::from_value(value).unwrap_or_default();
                }
                SENTIMENT_HISTORY_KEY => {
                    self.trackers.sentiment_history =
                        serde_json::from_value::<SentimentHistory>(value).unwrap_or_default();
                }
                _ => match serde_json::from_value::<MemoryRecord>(value) {
                    Ok(record) => {
                        self.records.insert(key, record);
                    }
                    Err(e) => {
                        if !is_reserved_key(&key) {
                            tracing::warn!("Skipping unreadable memory record '{}': {}", key, e);
                        }
                    }
                },
            }
        }
    }

    fn encode_memory_document(&self) -> Result<String> {
        let mut object = Map::new();

        for (key, record) in &self.records {
            object.insert(key.clone(), serde_json::to_value(record)?);
        }

        if let Some(at) = self.last_updated {
            object.insert(LAST_UPDATED_KEY.to_string(), serde_json::to_value(at)?);
        }
        if !self.trackers.entity_frequency.is_empty() {
            object.insert(
                ENTITY_FREQUENCY_KEY.to_string(),
                serde_json::to_value(&self.trackers.entity_frequency)?,
            );
        }
        if !self.trackers.themes.is_empty() {
            object.insert(
                THEMES_KEY.to_string(),
                serde_json::to_value(&self.trackers.themes)?,
            );
        }
        if !self.trackers.sentiment_history.is_empty() {
            object.insert(
                SENTIMENT_HISTORY_KEY.to_string(),
                serde_json::to_value(&self.trackers.sentiment_history)?,
            );
        }

        Ok(serde_json::to_string_pretty(&Value::Object(object))?)
    }

    async fn persist_memory(&self) -> Result<()> {
        let body = self.encode_memory_document()?;
        self.backend.write(MEMORY_DOC, &body).await
    }
}
