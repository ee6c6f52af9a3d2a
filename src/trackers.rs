//! Running aggregates fed back into prompt construction
//!
//! - `EntityFrequency`: mention counts per entity key
//! - `ThemeTracker`: motif occurrence counts across assistant replies
//! - `SentimentHistory`: per-turn user polarity, summarized as an emotional arc
//!
//! All three are monotonic and only reset by a full wipe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Entity Frequency ─────────────────────────────────────────────────────────

/// Mention count per entity key
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EntityFrequency {
    counts: BTreeMap<String, u64>,
}

impl EntityFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more mention and return the new count
    pub fn bump(&mut self, key: &str) -> u64 {
        let count = self.counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Mentions so far (0 if never seen)
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

// ─── Themes ───────────────────────────────────────────────────────────────────

/// Counts how many replies mentioned each motif of a fixed vocabulary
#[derive(Debug, Clone, Default)]
pub struct ThemeTracker {
    motifs: Vec<String>,
    counts: BTreeMap<String, u64>,
}

impl ThemeTracker {
    pub fn new<I, S>(motifs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary: Vec<String> = Vec::new();
        for motif in motifs {
            let motif = motif.into().to_lowercase();
            if !motif.is_empty() && !vocabulary.contains(&motif) {
                vocabulary.push(motif);
            }
        }

        Self {
            motifs: vocabulary,
            counts: BTreeMap::new(),
        }
    }

    /// Scan a reply; each motif present counts once, however often it appears.
    /// Returns the motifs found.
    pub fn observe(&mut self, reply: &str) -> Vec<String> {
        let lower = reply.to_lowercase();
        let found: Vec<String> = self
            .motifs
            .iter()
            .filter(|m| lower.contains(m.as_str()))
            .cloned()
            .collect();

        for motif in &found {
            *self.counts.entry(motif.clone()).or_insert(0) += 1;
        }

        found
    }

    pub fn count(&self, motif: &str) -> u64 {
        self.counts.get(motif).copied().unwrap_or(0)
    }

    /// Motifs seen at least once
    pub fn total_themes(&self) -> usize {
        self.counts.len()
    }

    /// `"Recurring motifs: moon (3x), ink (1x)"`, or empty before any motif appears.
    /// Ties keep alphabetical order.
    pub fn summary(&self, top_n: usize) -> String {
        if self.counts.is_empty() || top_n == 0 {
            return String::new();
        }

        let mut ranked: Vec<(&String, &u64)> = self.counts.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1));

        let parts: Vec<String> = ranked
            .into_iter()
            .take(top_n)
            .map(|(motif, count)| format!("{motif} ({count}x)"))
            .collect();

        format!("Recurring motifs: {}", parts.join(", "))
    }

    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }

    /// Replace counts with a persisted snapshot
    pub fn restore(&mut self, counts: BTreeMap<String, u64>) {
        self.counts = counts;
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

// ─── Sentiment ────────────────────────────────────────────────────────────────

/// Append-only per-turn polarity values
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SentimentHistory {
    samples: Vec<f32>,
}

impl SentimentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, polarity: f32) {
        self.samples.push(polarity.clamp(-1.0, 1.0));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mean of the trailing `window` samples, once `min_samples` exist
    pub fn recent_average(&self, min_samples: usize, window: usize) -> Option<f32> {
        if self.samples.len() < min_samples.max(1) || window == 0 {
            return None;
        }
        let tail = &self.samples[self.samples.len().saturating_sub(window)..];
        Some(tail.iter().sum::<f32>() / tail.len() as f32)
    }

    /// Bucketed trajectory line, or empty when there are too few samples
    pub fn arc(&self, min_samples: usize, window: usize) -> String {
        let Some(avg) = self.recent_average(min_samples, window) else {
            return String::new();
        };

        let label = if avg > 0.3 {
            "predominantly positive"
        } else if avg < -0.3 {
            "increasingly melancholic"
        } else {
            "emotionally balanced"
        };

        format!("Emotional arc: {label} (avg sentiment: {avg:+.2})")
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

// ─── Snapshot ─────────────────────────────────────────────────────────────────

/// Persisted form of the three trackers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackerSnapshot {
    pub entity_frequency: EntityFrequency,
    pub themes: BTreeMap<String, u64>,
    pub sentiment_history: SentimentHistory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_is_monotonic() {
        let mut freq = EntityFrequency::new();
        assert_eq!(freq.get("Poe"), 0);
        assert_eq!(freq.bump("Poe"), 1);
        assert_eq!(freq.bump("Poe"), 2);
        assert_eq!(freq.bump("poe"), 1);
        assert_eq!(freq.len(), 2);
    }

    #[test]
    fn motif_counts_once_per_reply() {
        let mut themes = ThemeTracker::new(["moon", "ink", "raven"]);

        let found = themes.observe("The Moon, the moon, always the MOON... and ink.");
        assert_eq!(found, vec!["moon".to_string(), "ink".to_string()]);
        assert_eq!(themes.count("moon"), 1);

        themes.observe("Moonlight again");
        assert_eq!(themes.count("moon"), 2);
        assert_eq!(themes.count("raven"), 0);
        assert_eq!(themes.total_themes(), 2);
    }

    #[test]
    fn theme_summary_ranks_by_count() {
        let mut themes = ThemeTracker::new(["moon", "ink", "raven"]);
        assert_eq!(themes.summary(3), "");

        themes.observe("raven");
        themes.observe("moon and raven");
        themes.observe("moon, raven, ink");

        assert_eq!(
            themes.summary(2),
            "Recurring motifs: raven (3x), moon (2x)"
        );
    }

    #[test]
    fn arc_needs_minimum_samples() {
        let mut history = SentimentHistory::new();
        history.push(0.9);
        history.push(0.8);
        assert_eq!(history.arc(3, 5), "");

        history.push(0.7);
        assert_eq!(
            history.arc(3, 5),
            "Emotional arc: predominantly positive (avg sentiment: +0.80)"
        );
    }

    #[test]
    fn arc_averages_only_the_trailing_window() {
        let mut history = SentimentHistory::new();
        for _ in 0..5 {
            history.push(0.9);
        }
        for _ in 0..5 {
            history.push(-0.6);
        }

        let arc = history.arc(3, 5);
        assert!(arc.contains("increasingly melancholic"));
        assert!(arc.contains("-0.60"));
    }

    #[test]
    fn balanced_arc_between_thresholds() {
        let mut history = SentimentHistory::new();
        history.push(0.3);
        history.push(-0.3);
        history.push(0.0);
        assert!(history.arc(3, 5).contains("emotionally balanced"));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut snapshot = TrackerSnapshot::default();
        snapshot.entity_frequency.bump("Poe");
        snapshot.themes.insert("moon".into(), 2);
        snapshot.sentiment_history.push(-0.5);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TrackerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
