//! # Session - the per-conversation turn orchestrator
//!
//! One [`Session`] owns the store, the ranker cache and the trackers for a
//! single conversation. Turns run strictly one after another: `turn` takes
//! `&mut self` and only returns once the reply (or its absence) has been
//! committed and persisted.
//!
//! Chat turn:
//! 1. sentiment and entity extraction, record upserts
//! 2. recall, preamble composition, dispatch list assembly
//! 3. user message appended to the durable context
//! 4. dispatch; on a reply: append it, observe motifs, prune, persist
//!
//! Command turns skip 1-2 and send the durable context plus the raw input.

use crate::analyzer::TextAnalyzer;
use crate::config::SessionConfig;
use crate::context::{prune_context, ContextAssembler};
use crate::error::Result;
use crate::lexicon::contains_phrase;
use crate::model::ChatModel;
use crate::ranker::RelevanceRanker;
use crate::store::MemoryStore;
use crate::trackers::{EntityFrequency, SentimentHistory, ThemeTracker, TrackerSnapshot};
use crate::types::{
    is_reserved_key, ChatMessage, MemoryRecord, MemorySummary, PreferenceTag, RankedEntity,
    RecordKind, Role,
};
use std::collections::HashSet;
use std::sync::Arc;

/// How an input is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Starts with a reserved prefix; dispatched verbatim without memory
    Command,
    Chat,
}

/// Result of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied(String),
    /// The model produced nothing; the user message stays in the context
    NoReply,
}

impl TurnOutcome {
    pub fn reply(&self) -> Option<&str> {
        match self {
            TurnOutcome::Replied(reply) => Some(reply),
            TurnOutcome::NoReply => None,
        }
    }
}

pub struct Session {
    config: SessionConfig,
    store: MemoryStore,
    analyzer: Arc<dyn TextAnalyzer>,
    model: Arc<dyn ChatModel>,
    ranker: RelevanceRanker,
    assembler: ContextAssembler,
    context: Vec<ChatMessage>,
    frequency: EntityFrequency,
    themes: ThemeTracker,
    sentiment: SentimentHistory,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("ranker", &self.ranker)
            .field("model", &self.model.model_name())
            .field("context", &self.context.len())
            .finish()
    }
}

impl Session {
    /// Build a session over an opened store, restoring trackers and context.
    ///
    /// A persisted context keeps its history but gets the current persona as
    /// element 0; an empty one starts from the persona alone.
    pub fn new(
        config: SessionConfig,
        store: MemoryStore,
        analyzer: Arc<dyn TextAnalyzer>,
        model: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        config.validate()?;

        let ranker = RelevanceRanker::new(
            Arc::clone(&analyzer),
            config.relevance_threshold,
            config.recall_limit,
            config.representation_cache_capacity,
        );
        let assembler = ContextAssembler::new(config.persona.clone(), config.neutral_threshold);

        let snapshot = store.trackers().clone();
        let mut themes = ThemeTracker::new(config.motifs.iter().cloned());
        themes.restore(snapshot.themes);

        let mut context = store.load_context();
        match context.first().map(|m| m.role) {
            Some(Role::System) => context[0] = assembler.base_system(),
            Some(_) => context.insert(0, assembler.base_system()),
            None => context.push(assembler.base_system()),
        }
        prune_context(&mut context, config.max_context_messages);

        tracing::info!(
            backend = store.backend_name(),
            records = store.metadata().total_entries,
            context = context.len(),
            analyzer = analyzer.name(),
            model = model.model_name(),
            "Session ready"
        );

        Ok(Self {
            config,
            store,
            analyzer,
            model,
            ranker,
            assembler,
            context,
            frequency: snapshot.entity_frequency,
            themes,
            sentiment: snapshot.sentiment_history,
        })
    }

    pub fn classify(&self, input: &str) -> InputKind {
        let trimmed = input.trim_start();
        if self
            .config
            .command_prefixes
            .iter()
            .any(|p| !p.is_empty() && trimmed.starts_with(p.as_str()))
        {
            InputKind::Command
        } else {
            InputKind::Chat
        }
    }

    /// Run one full turn. Only persistence failures are errors; a missing
    /// reply is [`TurnOutcome::NoReply`].
    pub async fn turn(&mut self, input: &str) -> Result<TurnOutcome> {
        let kind = self.classify(input);

        let messages = match kind {
            InputKind::Chat => self.prepare_chat(input).await?,
            InputKind::Command => {
                let mut messages = self.context.clone();
                messages.push(ChatMessage::user(input));
                messages
            }
        };
        self.context.push(ChatMessage::user(input));

        let outcome = match self.model.send(&messages).await {
            Ok(reply) if !reply.trim().is_empty() => {
                let reply = reply.trim().to_string();
                self.context.push(ChatMessage::assistant(reply.clone()));

                let motifs = self.themes.observe(&reply);
                if !motifs.is_empty() {
                    tracing::debug!(?motifs, "Motifs observed");
                }

                let dropped = prune_context(&mut self.context, self.config.max_context_messages);
                if dropped > 0 {
                    tracing::debug!(dropped, "Context window pruned");
                }

                self.store.save_context(&self.context).await?;
                TurnOutcome::Replied(reply)
            }
            Ok(_) => {
                tracing::warn!("Model returned an empty reply");
                TurnOutcome::NoReply
            }
            Err(e) => {
                tracing::warn!("Model dispatch failed: {}", e);
                TurnOutcome::NoReply
            }
        };

        self.store.save_trackers(self.tracker_snapshot()).await?;

        Ok(outcome)
    }

    /// Steps 1-2 of a chat turn; returns the dispatch list
    async fn prepare_chat(&mut self, input: &str) -> Result<Vec<ChatMessage>> {
        let polarity = self.analyzer.polarity(input);

        // Trackers move only after every record is persisted
        let entities = self.entities_in(input);
        if !entities.is_empty() {
            let tag = self.preference_tag(input);
            let kind = if tag.is_some() {
                RecordKind::Preference
            } else {
                RecordKind::Sentiment
            };
            let excerpt: String = input.chars().take(self.config.excerpt_limit).collect();

            for entity in &entities {
                let mut record = MemoryRecord::new(kind, polarity, excerpt.clone());
                if let Some(tag) = tag {
                    record = record.with_tag(tag);
                }
                self.ranker.invalidate(entity);
                self.store.upsert(entity, record).await?;
            }

            for entity in &entities {
                self.frequency.bump(entity);
            }

            tracing::debug!(?entities, %kind, polarity, "Memories updated");
        }
        self.sentiment.push(polarity);

        let recalled = self
            .ranker
            .recall(input, self.store.get_all(), &self.frequency);

        let (arc, themes) = if recalled.is_empty() {
            (String::new(), String::new())
        } else {
            (
                self.sentiment
                    .arc(self.config.arc_min_samples, self.config.arc_window),
                self.themes.summary(self.config.theme_top_n),
            )
        };

        Ok(self
            .assembler
            .assemble(&self.context, &recalled, &arc, &themes, input))
    }

    fn entities_in(&self, input: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut entities: Vec<String> = self
            .analyzer
            .extract_entities(input)
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty() && !is_reserved_key(e))
            .filter(|e| seen.insert(e.clone()))
            .collect();
        entities.truncate(self.config.max_entities);
        entities
    }

    /// First matching keyword wins, like-list first
    fn preference_tag(&self, input: &str) -> Option<PreferenceTag> {
        let lower = input.to_lowercase();
        let any_of = |keywords: &[String]| {
            keywords
                .iter()
                .any(|k| contains_phrase(&lower, &k.to_lowercase()))
        };

        if any_of(&self.config.like_keywords) {
            Some(PreferenceTag::Like)
        } else if any_of(&self.config.dislike_keywords) {
            Some(PreferenceTag::Dislike)
        } else {
            None
        }
    }

    fn tracker_snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            entity_frequency: self.frequency.clone(),
            themes: self.themes.counts().clone(),
            sentiment_history: self.sentiment.clone(),
        }
    }

    // ─── Resets ───────────────────────────────────────────────────────────

    /// Wipe memory, trackers and the dialogue
    pub async fn reset_all(&mut self) -> Result<()> {
        self.store.clear().await?;
        self.frequency.clear();
        self.themes.clear();
        self.sentiment.clear();
        self.ranker.clear_cache();
        self.reset_context().await?;
        tracing::info!("Memory and context wiped");
        Ok(())
    }

    /// Drop the dialogue history, keeping memories
    pub async fn reset_context(&mut self) -> Result<()> {
        self.store.clear_context().await?;
        self.context = vec![self.assembler.base_system()];
        Ok(())
    }

    // ─── Introspection ────────────────────────────────────────────────────

    /// The durable context
    pub fn context(&self) -> &[ChatMessage] {
        &self.context
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn frequency(&self) -> &EntityFrequency {
        &self.frequency
    }

    pub fn themes(&self) -> &ThemeTracker {
        &self.themes
    }

    pub fn sentiment(&self) -> &SentimentHistory {
        &self.sentiment
    }

    pub fn ranker(&self) -> &RelevanceRanker {
        &self.ranker
    }

    /// Totals, the strongest likes and dislikes, and tracker summaries
    pub fn memory_summary(&self, top_n: usize) -> MemorySummary {
        let neutral = self.config.neutral_threshold;
        let ranked = |keep: &dyn Fn(f32) -> bool| -> Vec<RankedEntity> {
            self.store
                .get_all()
                .iter()
                .filter(|(key, record)| !is_reserved_key(key) && keep(record.score))
                .map(|(key, record)| RankedEntity {
                    key: key.clone(),
                    score: record.score,
                    frequency: self.frequency.get(key),
                    kind: record.kind,
                })
                .collect()
        };

        let mut likes = ranked(&|score| score > neutral);
        likes.sort_by(|a, b| b.score.total_cmp(&a.score));
        likes.truncate(top_n);

        let mut dislikes = ranked(&|score| score < -neutral);
        dislikes.sort_by(|a, b| a.score.total_cmp(&b.score));
        dislikes.truncate(top_n);

        let metadata = self.store.metadata();

        MemorySummary {
            total_entries: metadata.total_entries,
            total_entities: self.frequency.len(),
            total_themes: self.themes.total_themes(),
            last_updated: metadata.last_updated,
            has_context: self.context.len() > 1,
            likes,
            dislikes,
            theme_summary: self.themes.summary(self.config.theme_top_n),
            emotional_arc: self
                .sentiment
                .arc(self.config.arc_min_samples, self.config.arc_window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::LexiconAnalyzer;
    use crate::config::SessionConfigBuilder;
    use crate::test_support::{ReadOnlyBackend, ScriptedAnalyzer, ScriptedModel};
    use std::path::Path;

    fn config() -> SessionConfig {
        SessionConfigBuilder::new().persona("You are Nikki.").build().unwrap()
    }

    async fn session(
        dir: &Path,
        config: SessionConfig,
        analyzer: impl TextAnalyzer + 'static,
        model: Arc<ScriptedModel>,
    ) -> Session {
        let store = MemoryStore::open_dir(dir).await.unwrap();
        Session::new(config, store, Arc::new(analyzer), model).unwrap()
    }

    #[tokio::test]
    async fn liked_entity_becomes_preference() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([Some("Poe is wonderful.")]));
        let mut s = session(dir.path(), config(), LexiconAnalyzer::default(), model).await;

        let outcome = s
            .turn("I really love gothic fiction and Edgar Allan Poe.")
            .await
            .unwrap();

        assert_eq!(outcome.reply(), Some("Poe is wonderful."));
        let record = s.store().get("Edgar Allan Poe").unwrap();
        assert_eq!(record.kind, RecordKind::Preference);
        assert_eq!(record.tag, Some(PreferenceTag::Like));
        assert!(record.score > 0.0);
        assert_eq!(s.frequency().get("Edgar Allan Poe"), 1);
    }

    #[tokio::test]
    async fn negative_mention_without_keyword_is_sentiment() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([Some("How awful.")]));
        let mut s = session(dir.path(), config(), LexiconAnalyzer::default(), model).await;

        s.turn("That noisy party was terrible.").await.unwrap();

        let record = s.store().get("party").unwrap();
        assert_eq!(record.kind, RecordKind::Sentiment);
        assert_eq!(record.tag, None);
        assert!(record.score < 0.0);
        assert_eq!(record.excerpt, "That noisy party was terrible.");
    }

    #[tokio::test]
    async fn failed_dispatch_keeps_only_the_user_message() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([None]));
        let mut s = session(dir.path(), config(), LexiconAnalyzer::default(), model).await;
        let before = s.context().len();

        let outcome = s.turn("Are you there?").await.unwrap();

        assert_eq!(outcome, TurnOutcome::NoReply);
        assert_eq!(s.context().len(), before + 1);
        assert_eq!(s.context().last(), Some(&ChatMessage::user("Are you there?")));
        assert!(s.context().iter().all(|m| m.role != Role::Assistant));
    }

    #[tokio::test]
    async fn blank_reply_counts_as_no_reply() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([Some("   ")]));
        let mut s = session(dir.path(), config(), LexiconAnalyzer::default(), model).await;

        assert_eq!(s.turn("hello").await.unwrap(), TurnOutcome::NoReply);
        assert!(s.context().iter().all(|m| m.role != Role::Assistant));
    }

    #[tokio::test]
    async fn recalled_memory_reaches_the_model_but_not_the_context() {
        let first = "I love Poe";
        let second = "Any writers you like lately?";
        let analyzer = ScriptedAnalyzer::new()
            .entities(first, &["Poe"])
            .polarity(first, 0.8)
            .similar(second, "Poe", 0.9);
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([Some("Yes."), Some("Poe, always.")]));
        let mut s = session(dir.path(), config(), analyzer, Arc::clone(&model)).await;

        s.turn(first).await.unwrap();
        s.turn(second).await.unwrap();

        let sent = model.last_request();
        assert!(sent[0].content.starts_with("You are Nikki."));
        assert!(sent[0].content.contains("'Poe': a beloved interest"));
        assert!(sent[0].content.contains("relevance: 0.90"));
        assert_eq!(sent.last(), Some(&ChatMessage::user(second)));

        assert_eq!(s.context()[0], ChatMessage::system("You are Nikki."));
        assert_eq!(s.context().len(), 5);
    }

    #[tokio::test]
    async fn mentioning_an_entity_again_refreshes_its_cached_representation() {
        let first = "I love Poe";
        let second = "Any writers you like lately?";
        let third = "Poe wrote The Raven";
        let analyzer = ScriptedAnalyzer::new()
            .entities(first, &["Poe"])
            .polarity(first, 0.8)
            .similar(second, "Poe", 0.9)
            .entities(third, &["Poe"])
            .similar(third, "Poe", 0.9);
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([Some("Yes."), Some("Poe."), Some("Indeed.")]));
        let mut s = session(dir.path(), config(), analyzer, model).await;

        s.turn(first).await.unwrap();
        assert!(!s.ranker().is_cached("Poe"));

        s.turn(second).await.unwrap();
        assert!(s.ranker().is_cached("Poe"));
        assert_eq!(s.ranker().cache_stats().invalidations, 0);
        assert_eq!(s.ranker().cache_stats().misses, 1);

        s.turn(third).await.unwrap();
        let stats = s.ranker().cache_stats();
        assert_eq!(stats.invalidations, 1);
        assert_eq!(stats.misses, 2);
        assert!(s.ranker().is_cached("Poe"));
        assert_eq!(s.store().get("Poe").unwrap().excerpt, third);
    }

    #[tokio::test]
    async fn failed_record_write_leaves_trackers_untouched() {
        let input = "I love Poe";
        let analyzer = ScriptedAnalyzer::new()
            .entities(input, &["Poe"])
            .polarity(input, 0.8);
        let store = MemoryStore::open(Arc::new(ReadOnlyBackend)).await.unwrap();
        let model = Arc::new(ScriptedModel::new([Some("unused")]));
        let mut s = Session::new(config(), store, Arc::new(analyzer), model.clone()).unwrap();

        assert!(s.turn(input).await.is_err());

        assert!(s.sentiment().is_empty());
        assert_eq!(s.frequency().get("Poe"), 0);
        assert_eq!(s.context(), &[ChatMessage::system("You are Nikki.")]);
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn commands_skip_memory_and_are_sent_verbatim() {
        let analyzer = ScriptedAnalyzer::new()
            .entities("/summarize Poe", &["Poe"])
            .polarity("/summarize Poe", 0.9);
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([Some("Summary.")]));
        let mut s = session(dir.path(), config(), analyzer, Arc::clone(&model)).await;

        assert_eq!(s.classify("/summarize Poe"), InputKind::Command);
        assert_eq!(s.classify("hello /there"), InputKind::Chat);

        s.turn("/summarize Poe").await.unwrap();

        assert!(s.store().get("Poe").is_none());
        assert!(s.sentiment().is_empty());
        assert_eq!(
            model.last_request(),
            vec![ChatMessage::system("You are Nikki."), ChatMessage::user("/summarize Poe")]
        );
        assert_eq!(s.context().len(), 3);
    }

    #[tokio::test]
    async fn context_is_pruned_to_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfigBuilder::new()
            .persona("You are Nikki.")
            .max_context_messages(4)
            .build()
            .unwrap();
        let model = Arc::new(ScriptedModel::new([Some("one"), Some("two"), Some("three")]));
        let mut s = session(dir.path(), config, LexiconAnalyzer::default(), model).await;

        for input in ["a", "b", "c"] {
            s.turn(input).await.unwrap();
        }

        assert_eq!(s.context().len(), 4);
        assert_eq!(s.context()[0], ChatMessage::system("You are Nikki."));
        assert_eq!(s.context()[3], ChatMessage::assistant("three"));
    }

    #[tokio::test]
    async fn motifs_in_replies_feed_the_theme_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([
            Some("The moon watches the raven."),
            Some("Moonlight on ink."),
        ]));
        let mut s = session(dir.path(), config(), LexiconAnalyzer::default(), model).await;

        s.turn("hi").await.unwrap();
        s.turn("more").await.unwrap();

        assert_eq!(s.themes().count("moon"), 2);
        assert_eq!(s.themes().count("raven"), 1);
        assert_eq!(s.memory_summary(3).total_themes, 3);
    }

    #[tokio::test]
    async fn state_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([Some("The raven knows.")]));
        let mut s = session(dir.path(), config(), LexiconAnalyzer::default(), model).await;
        s.turn("I adore Edgar Allan Poe.").await.unwrap();
        let context = s.context().to_vec();
        drop(s);

        let renamed = SessionConfigBuilder::new().persona("You are Mira.").build().unwrap();
        let model = Arc::new(ScriptedModel::default());
        let s = session(dir.path(), renamed, LexiconAnalyzer::default(), model).await;

        assert_eq!(s.context().len(), context.len());
        assert_eq!(s.context()[0], ChatMessage::system("You are Mira."));
        assert_eq!(s.context()[1..], context[1..]);
        assert_eq!(s.frequency().get("Edgar Allan Poe"), 1);
        assert_eq!(s.themes().count("raven"), 1);
        assert_eq!(s.sentiment().len(), 1);
        assert!(s.store().get("Edgar Allan Poe").is_some());
    }

    #[tokio::test]
    async fn resets_wipe_what_they_name() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([Some("ok"), Some("ok")]));
        let mut s = session(dir.path(), config(), LexiconAnalyzer::default(), model).await;
        s.turn("I love Edgar Allan Poe.").await.unwrap();

        s.reset_context().await.unwrap();
        assert_eq!(s.context(), &[ChatMessage::system("You are Nikki.")]);
        assert!(s.store().get("Edgar Allan Poe").is_some());

        s.turn("I hate Tractor Repair.").await.unwrap();
        s.reset_all().await.unwrap();

        let summary = s.memory_summary(5);
        assert_eq!(summary.total_entries, 0);
        assert_eq!(summary.total_entities, 0);
        assert!(!summary.has_context);
        assert!(s.sentiment().is_empty());
    }

    #[tokio::test]
    async fn summary_ranks_likes_and_dislikes() {
        let analyzer = ScriptedAnalyzer::new()
            .entities("a", &["Poe"])
            .polarity("a", 0.9)
            .entities("b", &["Byron"])
            .polarity("b", 0.5)
            .entities("c", &["crowds"])
            .polarity("c", -0.7)
            .entities("d", &["tea"])
            .polarity("d", 0.1);
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([Some("ok"), Some("ok"), Some("ok"), Some("ok")]));
        let mut s = session(dir.path(), config(), analyzer, model).await;

        for input in ["a", "b", "c", "d"] {
            s.turn(input).await.unwrap();
        }

        let summary = s.memory_summary(5);
        let likes: Vec<&str> = summary.likes.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(likes, vec!["Poe", "Byron"]);
        assert_eq!(summary.dislikes.len(), 1);
        assert_eq!(summary.dislikes[0].key, "crowds");
        assert_eq!(summary.total_entries, 4);
        assert!(summary.has_context);
        assert_eq!(
            summary.emotional_arc,
            "Emotional arc: emotionally balanced (avg sentiment: +0.20)"
        );
        assert_eq!(s.memory_summary(1).likes.len(), 1);
    }
}
