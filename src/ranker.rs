//! Relevance ranking of stored memories against the current turn
//!
//! ```text
//! similarity     = sim(repr(input), repr(key))           in [0, 1]
//! base           = similarity * (1 + |record.score|)
//! frequency      = 1 + 0.1 * mentions(key)
//! weighted_score = base * frequency
//! admit if similarity >= T or weighted_score > T
//! ```
//!
//! Admitted candidates are stably sorted by weighted score and truncated to
//! the recall limit. Both admission branches share the same threshold on
//! purpose: the bar is low and favors recall over precision.

use crate::analyzer::TextAnalyzer;
use crate::cache::{CacheStats, RepresentationCache};
use crate::trackers::EntityFrequency;
use crate::types::{is_reserved_key, MemoryRecord, RecalledMemory};
use indexmap::IndexMap;
use std::sync::Arc;

/// Frequency boost per recorded mention
pub const FREQUENCY_BOOST_PER_MENTION: f32 = 0.1;

/// Composite relevance of one candidate
pub fn weighted_score(similarity: f32, sentiment: f32, mentions: u64) -> f32 {
    let base = similarity * (1.0 + sentiment.abs());
    let frequency_boost = 1.0 + FREQUENCY_BOOST_PER_MENTION * mentions as f32;
    base * frequency_boost
}

/// Scores stored memories and keeps a per-entity representation cache
pub struct RelevanceRanker {
    analyzer: Arc<dyn TextAnalyzer>,
    cache: RepresentationCache,
    threshold: f32,
    recall_limit: usize,
}

impl std::fmt::Debug for RelevanceRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceRanker")
            .field("analyzer", &self.analyzer.name())
            .field("threshold", &self.threshold)
            .field("recall_limit", &self.recall_limit)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl RelevanceRanker {
    pub fn new(
        analyzer: Arc<dyn TextAnalyzer>,
        threshold: f32,
        recall_limit: usize,
        cache_capacity: usize,
    ) -> Self {
        Self {
            analyzer,
            cache: RepresentationCache::new(cache_capacity),
            threshold,
            recall_limit,
        }
    }

    /// Select the memories worth injecting for `input`
    pub fn recall(
        &mut self,
        input: &str,
        records: &IndexMap<String, MemoryRecord>,
        frequency: &EntityFrequency,
    ) -> Vec<RecalledMemory> {
        let query = self.analyzer.represent(input);
        if query.is_degenerate() {
            tracing::debug!("Input has no usable representation, skipping recall");
            return Vec::new();
        }

        let mut admitted: Vec<RecalledMemory> = Vec::new();

        for (key, record) in records {
            if is_reserved_key(key) {
                continue;
            }

            let analyzer = Arc::clone(&self.analyzer);
            let candidate = self
                .cache
                .get_or_insert_with(key, || analyzer.represent(key));
            if candidate.is_degenerate() {
                continue;
            }

            let similarity = match self.analyzer.similarity(&query, &candidate) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Skipping memory '{}': {}", key, e);
                    continue;
                }
            };

            let mentions = frequency.get(key);
            let score = weighted_score(similarity, record.score, mentions);

            if similarity >= self.threshold || score > self.threshold {
                admitted.push(RecalledMemory {
                    key: key.clone(),
                    weighted_score: score,
                    record: record.clone(),
                    similarity,
                    frequency: mentions,
                });
            }
        }

        admitted.sort_by(|a, b| b.weighted_score.total_cmp(&a.weighted_score));
        admitted.truncate(self.recall_limit);

        tracing::debug!(
            recalled = admitted.len(),
            candidates = records.len(),
            "Memory recall complete"
        );

        admitted
    }

    /// Forget the cached representation for a key whose record changed
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.cache.invalidate(key)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.cache.contains(key)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}
