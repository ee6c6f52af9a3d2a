//! # Reverie - weighted long-term memory for a chat persona
//!
//! Facts, preferences and sentiment about entities the user mentions are kept
//! across sessions, ranked against every new turn and injected into the
//! system preamble sent to the model.
//!
//! ```no_run
//! use reverie::{LexiconAnalyzer, MemoryStore, ModelConfig, OpenAiCompatibleClient, Session, SessionConfig};
//! use std::sync::Arc;
//!
//! # async fn demo() -> reverie::Result<()> {
//! let store = MemoryStore::open_dir("./reverie_data").await?;
//! let model = OpenAiCompatibleClient::new(ModelConfig::default())?;
//! let mut session = Session::new(
//!     SessionConfig::default(),
//!     store,
//!     Arc::new(LexiconAnalyzer::default()),
//!     Arc::new(model),
//! )?;
//!
//! if let Some(reply) = session.turn("I really love Edgar Allan Poe.").await?.reply() {
//!     println!("{reply}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod lexicon;
pub mod model;
pub mod ranker;
pub mod session;
pub mod storage_backend;
pub mod store;
pub mod trackers;
pub mod types;

#[cfg(test)]
mod test_support;

pub use analyzer::{cosine_similarity, LexiconAnalyzer, Representation, TextAnalyzer};
pub use cache::{CacheStats, RepresentationCache};
pub use config::{ModelConfig, SessionConfig, SessionConfigBuilder, DEFAULT_PERSONA};
pub use context::{memory_label, prune_context, ContextAssembler};
pub use error::{MemoryError, Result};
pub use model::{ChatModel, OpenAiCompatibleClient};
pub use ranker::{weighted_score, RelevanceRanker};
pub use session::{InputKind, Session, TurnOutcome};
pub use storage_backend::{DocumentBackend, JsonFileBackend, SqliteBackend};
pub use store::MemoryStore;
pub use trackers::{EntityFrequency, SentimentHistory, ThemeTracker, TrackerSnapshot};
pub use types::{
    ChatMessage, EntityKey, MemoryRecord, MemorySummary, PreferenceTag, RankedEntity,
    RecalledMemory, RecordKind, Role, StoreMetadata,
};
