//! Text analysis capability: representations, similarity, entities, sentiment
//!
//! The session only talks to [`TextAnalyzer`]. [`LexiconAnalyzer`] is a
//! zero-config implementation so the crate works without an NLP service.

use crate::error::{MemoryError, Result};
use crate::lexicon;
use std::collections::HashSet;

/// Dense semantic representation of a piece of text.
///
/// A zero-norm vector means the analyzer found no usable signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    vector: Vec<f32>,
}

impl Representation {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    /// An empty-signal representation of the given dimension
    pub fn zero(dimension: usize) -> Self {
        Self {
            vector: vec![0.0; dimension],
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    pub fn norm(&self) -> f32 {
        self.vector.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// True when there is nothing to compare against
    pub fn is_degenerate(&self) -> bool {
        self.vector.is_empty() || self.norm() <= f32::EPSILON
    }
}

/// The four NLP operations the memory engine consumes
pub trait TextAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Semantic representation of `text`
    fn represent(&self, text: &str) -> Representation;

    /// Symmetric similarity in `[0, 1]`
    fn similarity(&self, a: &Representation, b: &Representation) -> Result<f32>;

    /// Entity candidates in order of first appearance, without duplicates
    fn extract_entities(&self, text: &str) -> Vec<String>;

    /// Sentiment polarity in `[-1, 1]`
    fn polarity(&self, text: &str) -> f32;
}

/// Deterministic lexicon and hashing based analyzer.
///
/// Representations are hashed bags of content words plus character trigrams,
/// so "Poe" and "Edgar Allan Poe" overlap. Not a substitute for a learned model.
#[derive(Debug, Clone)]
pub struct LexiconAnalyzer {
    dimension: usize,
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        Self::new(256)
    }
}

impl LexiconAnalyzer {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hash = 1469598103934665603u64;
        for b in token.as_bytes() {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(1099511628211u64);
        }
        (hash as usize) % self.dimension
    }

    fn content_tokens(text: &str) -> Vec<String> {
        words(text)
            .map(|w| w.to_lowercase())
            .filter(|w| w.chars().count() > 2 && !lexicon::is_stopword(w))
            .collect()
    }
}

impl TextAnalyzer for LexiconAnalyzer {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn represent(&self, text: &str) -> Representation {
        let mut vec = vec![0.0f32; self.dimension];

        for token in Self::content_tokens(text) {
            vec[self.bucket(&token)] += 1.0;

            let padded: Vec<char> = format!("^{token}$").chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                vec[self.bucket(&gram)] += 0.5;
            }
        }

        let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vec {
                *v /= norm;
            }
        }

        Representation::new(vec)
    }

    fn similarity(&self, a: &Representation, b: &Representation) -> Result<f32> {
        cosine_similarity(a.as_slice(), b.as_slice()).map(|s| s.clamp(0.0, 1.0))
    }

    fn extract_entities(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        let mut push = |candidate: String| {
            if seen.insert(candidate.clone()) {
                entities.push(candidate);
            }
        };

        for clause in text.split(|c: char| matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '"')) {
            let mut run: Vec<&str> = Vec::new();

            for token in words(clause) {
                let lower = token.to_lowercase();
                let capitalized = token.chars().next().is_some_and(char::is_uppercase);

                if capitalized
                    && !lexicon::is_affect_word(&lower)
                    && !(run.is_empty() && lexicon::is_stopword(&lower))
                {
                    run.push(token);
                    continue;
                }

                flush_run(&mut run, &mut push);

                if is_content_word(&lower) {
                    push(lower);
                }
            }

            flush_run(&mut run, &mut push);
        }

        entities
    }

    fn polarity(&self, text: &str) -> f32 {
        let tokens: Vec<String> = words(text).map(|w| w.to_lowercase()).collect();
        let mut sum = 0.0f32;

        for (i, token) in tokens.iter().enumerate() {
            let Some(mut v) = lexicon::valence(token) else {
                continue;
            };

            if i > 0 && lexicon::is_booster(&tokens[i - 1]) {
                v += 0.293 * v.signum();
            }

            let window = &tokens[i.saturating_sub(3)..i];
            if window.iter().any(|w| lexicon::is_negation(w)) {
                v *= -0.74;
            }

            sum += v;
        }

        if sum == 0.0 {
            return 0.0;
        }

        (sum / (sum * sum + 15.0).sqrt()).clamp(-1.0, 1.0)
    }
}

/// Cosine similarity; mismatched or empty vectors are an error
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() || a.is_empty() {
        return Err(MemoryError::Analyzer(format!(
            "dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (norm_a * norm_b))
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
}

fn is_content_word(lower: &str) -> bool {
    lower.chars().count() > 2
        && lower.chars().any(char::is_alphabetic)
        && !lexicon::is_stopword(lower)
        && !lexicon::is_affect_word(lower)
        && !lexicon::is_booster(lower)
        && !lexicon::is_negation(lower)
}

fn flush_run(run: &mut Vec<&str>, push: &mut impl FnMut(String)) {
    if run.is_empty() {
        return;
    }
    let joined = run.join(" ");
    run.clear();
    if joined.chars().count() > 2 {
        push(joined);
    }
}
