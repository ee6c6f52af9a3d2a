//! Deterministic stand-ins for the analyzer, the model endpoint and storage

use crate::analyzer::{Representation, TextAnalyzer};
use crate::error::{MemoryError, Result};
use crate::model::ChatModel;
use crate::storage_backend::DocumentBackend;
use crate::types::ChatMessage;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// Analyzer whose similarities, entities and polarities are set by the test.
///
/// Each known text gets a one-dimensional representation holding its id;
/// unknown texts are degenerate.
#[derive(Debug, Default)]
pub struct ScriptedAnalyzer {
    ids: HashMap<String, usize>,
    scores: HashMap<(usize, usize), f32>,
    broken: HashSet<usize>,
    entities: HashMap<String, Vec<String>>,
    polarities: HashMap<String, f32>,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    fn id(&mut self, text: &str) -> usize {
        let next = self.ids.len() + 1;
        *self.ids.entry(text.to_string()).or_insert(next)
    }

    pub fn similar(mut self, a: &str, b: &str, score: f32) -> Self {
        let (a, b) = (self.id(a), self.id(b));
        self.scores.insert((a.min(b), a.max(b)), score);
        self
    }

    /// Similarity involving `text` fails
    pub fn broken(mut self, text: &str) -> Self {
        let id = self.id(text);
        self.broken.insert(id);
        self
    }

    pub fn entities(mut self, text: &str, entities: &[&str]) -> Self {
        self.entities
            .insert(text.to_string(), entities.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn polarity(mut self, text: &str, polarity: f32) -> Self {
        self.polarities.insert(text.to_string(), polarity);
        self
    }
}

impl TextAnalyzer for ScriptedAnalyzer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn represent(&self, text: &str) -> Representation {
        match self.ids.get(text) {
            Some(id) => Representation::new(vec![*id as f32]),
            None => Representation::zero(1),
        }
    }

    fn similarity(&self, a: &Representation, b: &Representation) -> Result<f32> {
        let a = a.as_slice()[0] as usize;
        let b = b.as_slice()[0] as usize;
        if self.broken.contains(&a) || self.broken.contains(&b) {
            return Err(MemoryError::Analyzer("scripted failure".to_string()));
        }
        Ok(self.scores.get(&(a.min(b), a.max(b))).copied().unwrap_or(0.0))
    }

    fn extract_entities(&self, text: &str) -> Vec<String> {
        self.entities.get(text).cloned().unwrap_or_default()
    }

    fn polarity(&self, text: &str) -> f32 {
        self.polarities.get(text).copied().unwrap_or(0.0)
    }
}

/// Model that replays queued replies and records what it was sent.
/// `None` in the queue (or an exhausted queue) is a dispatch failure.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<&'static str>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Vec<ChatMessage> {
        self.requests().pop().unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn send(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front().flatten() {
            Some(reply) => Ok(reply),
            None => Err(MemoryError::Dispatch("scripted failure".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Backend that reads nothing and refuses every write
#[derive(Debug, Default)]
pub struct ReadOnlyBackend;

#[async_trait]
impl DocumentBackend for ReadOnlyBackend {
    fn backend_name(&self) -> &'static str {
        "read-only"
    }

    async fn read(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn write(&self, _name: &str, _body: &str) -> Result<()> {
        Err(MemoryError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }
}
