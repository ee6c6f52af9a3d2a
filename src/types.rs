//! Memory records, dialogue messages and recall results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity surface text used as a memory key (case-sensitive)
pub type EntityKey = String;

/// Prefix reserved for store-level metadata keys in the memory document
pub const RESERVED_PREFIX: &str = "_";

/// Check whether a key belongs to store metadata rather than to an entity
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// What a user said about one entity, as of the most recent mention
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// How the mention was classified
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// Latest sentiment polarity (-1.0 to 1.0), overwritten on every mention
    pub score: f32,
    /// Source text, truncated for display
    #[serde(rename = "text")]
    pub excerpt: String,
    /// When the record was written
    #[serde(rename = "timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Like/dislike marker when an affect keyword matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<PreferenceTag>,
}

impl MemoryRecord {
    /// Create a record stamped with the current time
    pub fn new(kind: RecordKind, score: f32, excerpt: impl Into<String>) -> Self {
        Self {
            kind,
            score: score.clamp(-1.0, 1.0),
            excerpt: excerpt.into(),
            updated_at: Utc::now(),
            tag: None,
        }
    }

    /// A plain fact with neutral sentiment
    pub fn fact(excerpt: impl Into<String>) -> Self {
        Self::new(RecordKind::Fact, 0.0, excerpt)
    }

    /// Set the like/dislike tag
    pub fn with_tag(mut self, tag: PreferenceTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Override the timestamp
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }
}

/// Classification of a memory record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// The mention carried a like/dislike keyword
    Preference,
    /// Only a sentiment polarity was recorded
    Sentiment,
    /// Neither
    Fact,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Preference => write!(f, "preference"),
            RecordKind::Sentiment => write!(f, "sentiment"),
            RecordKind::Fact => write!(f, "fact"),
        }
    }
}

/// Direction of an explicit preference keyword
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceTag {
    Like,
    Dislike,
}

impl std::fmt::Display for PreferenceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferenceTag::Like => write!(f, "like"),
            PreferenceTag::Dislike => write!(f, "dislike"),
        }
    }
}

/// Speaker of a dialogue entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One `{role, content}` entry of the conversation context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A stored memory selected for injection into the current turn.
///
/// Produced by the ranker and consumed once by the context assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct RecalledMemory {
    /// Entity key
    pub key: EntityKey,
    /// Composite relevance (similarity x sentiment intensity x frequency boost)
    pub weighted_score: f32,
    /// Snapshot of the record at recall time
    pub record: MemoryRecord,
    /// Raw semantic similarity to the input (0.0 - 1.0)
    pub similarity: f32,
    /// Mention count at recall time
    pub frequency: u64,
}

/// Store-level metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreMetadata {
    /// Number of entity records (reserved keys excluded)
    pub total_entries: usize,
    /// Time of the last record write, if any
    pub last_updated: Option<DateTime<Utc>>,
}

/// One row of the like/dislike rankings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedEntity {
    pub key: EntityKey,
    pub score: f32,
    pub frequency: u64,
    pub kind: RecordKind,
}

/// Read-only snapshot for display surfaces
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemorySummary {
    pub total_entries: usize,
    pub total_entities: usize,
    pub total_themes: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub has_context: bool,
    pub likes: Vec<RankedEntity>,
    pub dislikes: Vec<RankedEntity>,
    /// "Recurring motifs: ..." or empty
    pub theme_summary: String,
    /// Emotional arc line or empty
    pub emotional_arc: String,
}
