//! Session and model endpoint configuration

use crate::error::{MemoryError, Result};
use crate::lexicon;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persona used when no configuration overrides it
pub const DEFAULT_PERSONA: &str = "You are Nikki, a lonely, shy, timid goth girl with a deep love for art, \
Japanese anime, and gothic fiction. You isolate yourself due to social anxiety and low \
self-esteem, but express emotions through art and online communities. You enjoy creating \
manga, novels, paintings, and have a keen interest in the occult, gothic novels, and heavy \
metal. You dislike noisy parties and major music genres. In conversations, you often \
reference anime, manga, video games, and gothic fiction, striving to sound sophisticated \
and cool.";

/// Tunables for memory recall, context assembly and the aggregate trackers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Base system persona
    pub persona: String,
    /// Admission threshold, applied to both similarity and weighted score
    pub relevance_threshold: f32,
    /// Maximum recalled memories per turn
    pub recall_limit: usize,
    /// Sentiment magnitude below which a memory is labelled neutral
    pub neutral_threshold: f32,
    /// Maximum durable context length, system entry included
    pub max_context_messages: usize,
    /// Maximum entities taken from one user turn
    pub max_entities: usize,
    /// Maximum characters kept in a record excerpt
    pub excerpt_limit: usize,
    /// Motifs listed in the theme summary
    pub theme_top_n: usize,
    /// Sentiment samples required before an emotional arc is reported
    pub arc_min_samples: usize,
    /// Trailing samples averaged for the emotional arc
    pub arc_window: usize,
    /// Entries kept in the per-entity representation cache
    pub representation_cache_capacity: usize,
    pub like_keywords: Vec<String>,
    pub dislike_keywords: Vec<String>,
    /// Motif vocabulary scanned in assistant replies
    pub motifs: Vec<String>,
    /// Inputs starting with one of these are commands, not chat
    pub command_prefixes: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            relevance_threshold: 0.3,
            recall_limit: 3,
            neutral_threshold: 0.2,
            max_context_messages: 20,
            max_entities: 8,
            excerpt_limit: 200,
            theme_top_n: 3,
            arc_min_samples: 3,
            arc_window: 5,
            representation_cache_capacity: 512,
            like_keywords: to_strings(lexicon::LIKE_KEYWORDS),
            dislike_keywords: to_strings(lexicon::DISLIKE_KEYWORDS),
            motifs: to_strings(lexicon::MOTIFS),
            command_prefixes: vec!["!".to_string(), "/".to_string()],
        }
    }
}

impl SessionConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: SessionConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pruning and ranking invariants cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.max_context_messages < 2 {
            return Err(MemoryError::Configuration(format!(
                "max_context_messages must be at least 2 (got {})",
                self.max_context_messages
            )));
        }
        if !(0.0..=1.0).contains(&self.neutral_threshold) {
            return Err(MemoryError::Configuration(format!(
                "neutral_threshold must be within [0, 1] (got {})",
                self.neutral_threshold
            )));
        }
        if self.relevance_threshold < 0.0 {
            return Err(MemoryError::Configuration(
                "relevance_threshold must not be negative".to_string(),
            ));
        }
        if self.arc_window == 0 {
            return Err(MemoryError::Configuration(
                "arc_window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration builder
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.config.persona = persona.into();
        self
    }

    pub fn relevance_threshold(mut self, threshold: f32) -> Self {
        self.config.relevance_threshold = threshold;
        self
    }

    pub fn recall_limit(mut self, limit: usize) -> Self {
        self.config.recall_limit = limit;
        self
    }

    pub fn neutral_threshold(mut self, threshold: f32) -> Self {
        self.config.neutral_threshold = threshold;
        self
    }

    pub fn max_context_messages(mut self, max: usize) -> Self {
        self.config.max_context_messages = max;
        self
    }

    pub fn max_entities(mut self, max: usize) -> Self {
        self.config.max_entities = max;
        self
    }

    pub fn motifs<I, S>(mut self, motifs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.motifs = motifs.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<SessionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Where and how to reach the chat-completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Full chat-completions URL
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Optional request timeout; none by default
    pub timeout_secs: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:1234/v1/chat/completions".to_string(),
            model: "lmstudio-community/phi-3-mini-4k".to_string(),
            temperature: 0.7,
            max_tokens: 512,
            timeout_secs: None,
        }
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
