//! # Context Assembly
//!
//! Builds the messages sent to the model for one turn. The durable context is
//! never touched here: the composed preamble only lives in the returned copy.
//!
//! ```text
//! [0] system: persona
//!             **USER MEMORY CONTEXT:**
//!             - 'key': label (mention-note, sentiment: +0.80, relevance: 0.90)
//!             Emotional arc: ...
//!             Recurring motifs: ...
//! [1..n-1]   durable history
//! [n]        user: current input
//! ```

use crate::types::{ChatMessage, MemoryRecord, RecalledMemory, RecordKind, Role};

/// Human-readable description of a record, bucketed by the neutral threshold
pub fn memory_label(record: &MemoryRecord, neutral_threshold: f32) -> &'static str {
    let positive = record.score > neutral_threshold;
    let negative = record.score < -neutral_threshold;

    match record.kind {
        RecordKind::Preference if positive => "a beloved interest",
        RecordKind::Preference if negative => "something disliked",
        RecordKind::Preference => "a neutral topic",
        RecordKind::Sentiment if positive => "positive memory",
        RecordKind::Sentiment if negative => "difficult memory",
        RecordKind::Sentiment => "neutral memory",
        RecordKind::Fact => "known fact",
    }
}

fn mention_note(frequency: u64) -> String {
    if frequency > 1 {
        format!("mentioned {frequency}x")
    } else {
        "new".to_string()
    }
}

/// Composes the per-turn system preamble and the outbound message list
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    persona: String,
    neutral_threshold: f32,
}

impl ContextAssembler {
    pub fn new(persona: impl Into<String>, neutral_threshold: f32) -> Self {
        Self {
            persona: persona.into(),
            neutral_threshold,
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// The unmodified system entry kept in the durable context
    pub fn base_system(&self) -> ChatMessage {
        ChatMessage::system(self.persona.clone())
    }

    /// Persona plus memory, arc and theme sections. `arc` and `themes` are only
    /// rendered when something was recalled and they are non-empty.
    pub fn compose_preamble(&self, recalled: &[RecalledMemory], arc: &str, themes: &str) -> String {
        let mut preamble = self.persona.clone();
        if recalled.is_empty() {
            return preamble;
        }

        preamble.push_str("\n\n**USER MEMORY CONTEXT:**");
        for memory in recalled {
            preamble.push_str(&format!(
                "\n- '{}': {} ({}, sentiment: {:+.2}, relevance: {:.2})",
                memory.key,
                memory_label(&memory.record, self.neutral_threshold),
                mention_note(memory.frequency),
                memory.record.score,
                memory.similarity,
            ));
        }

        if !arc.is_empty() {
            preamble.push_str("\n\n");
            preamble.push_str(arc);
        }
        if !themes.is_empty() {
            preamble.push_str("\n\n");
            preamble.push_str(themes);
        }

        preamble
    }

    /// Ephemeral dispatch list: a copy of `durable` with index 0 replaced by the
    /// composed preamble and the user turn appended
    pub fn assemble(
        &self,
        durable: &[ChatMessage],
        recalled: &[RecalledMemory],
        arc: &str,
        themes: &str,
        user_input: &str,
    ) -> Vec<ChatMessage> {
        let system = ChatMessage::system(self.compose_preamble(recalled, arc, themes));

        let mut messages = Vec::with_capacity(durable.len() + 2);
        messages.push(system);
        match durable.first() {
            Some(first) if first.role == Role::System => messages.extend_from_slice(&durable[1..]),
            _ => messages.extend_from_slice(durable),
        }
        messages.push(ChatMessage::user(user_input));

        tracing::debug!(
            messages = messages.len(),
            recalled = recalled.len(),
            "Dispatch context assembled"
        );

        messages
    }
}

/// Bound `context` to `max_messages` entries, keeping element 0 and the most
/// recent `max_messages - 1`. Returns how many entries were dropped.
pub fn prune_context(context: &mut Vec<ChatMessage>, max_messages: usize) -> usize {
    let max_messages = max_messages.max(2);
    if context.len() <= max_messages {
        return 0;
    }

    let excess = context.len() - max_messages;
    context.drain(1..1 + excess);
    excess
}
