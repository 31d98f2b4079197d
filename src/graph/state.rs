// src/graph/state.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in the conversation window. Order is arrival order and is never
/// changed after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Response modality chosen by the router, consumed once by the branch
/// dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    #[default]
    Conversation,
    Image,
    Audio,
    VoiceCall,
}

impl Workflow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Conversation => "conversation",
            Workflow::Image => "image",
            Workflow::Audio => "audio",
            Workflow::VoiceCall => "voice_call",
        }
    }

    /// Strict parse of a router label. Anything else is a validation failure
    /// handled by the router's retry/fallback path.
    pub fn parse_label(s: &str) -> Option<Workflow> {
        match s.trim().trim_matches(|c| c == '\'' || c == '"') {
            "conversation" => Some(Workflow::Conversation),
            "image" => Some(Workflow::Image),
            "audio" => Some(Workflow::Audio),
            "voice_call" => Some(Workflow::VoiceCall),
            _ => None,
        }
    }
}

/// Metadata for an outbound call initiated during a voice_call turn. Read
/// once by the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInfo {
    pub call_id: String,
    pub status: String,
    pub initiated_at: DateTime<Utc>,
}

/// The full mutable record carried through one thread's turns.
///
/// Merge rules, applied per field when a node patch lands:
/// - `messages`: append-only; eviction happens only through an explicit
///   `evict_to_last` during summarization. Never reordered.
/// - `summary`, `workflow`, `memory_context`, `current_activity`,
///   `apply_activity`: scalar overwrite.
/// - `image_path`, `audio`, `call`: transient per-turn outputs, overwritten
///   by the response stage that produces them and cleared at turn start.
/// - `thread_id`, `user_id`, `phone_number`: immutable after creation, never
///   patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub thread_id: String,
    pub user_id: String,
    pub phone_number: Option<String>,

    pub messages: Vec<ChatMessage>,
    pub summary: String,
    pub workflow: Workflow,
    pub memory_context: String,
    pub current_activity: String,
    pub apply_activity: bool,

    pub image_path: Option<String>,
    pub audio: Option<Vec<u8>>,
    pub call: Option<CallInfo>,
}

impl ConversationState {
    pub fn new<S: Into<String>>(thread_id: S, user_id: S) -> Self {
        Self {
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            phone_number: None,
            messages: Vec::new(),
            summary: String::new(),
            workflow: Workflow::Conversation,
            memory_context: String::new(),
            current_activity: String::new(),
            apply_activity: false,
            image_path: None,
            audio: None,
            call: None,
        }
    }

    /// Reset the fields that are only meaningful within a single turn.
    pub fn begin_turn(&mut self) {
        self.image_path = None;
        self.audio = None;
        self.call = None;
        self.memory_context.clear();
    }

    /// Merge a node's partial patch into the state.
    pub fn apply(&mut self, patch: StatePatch) {
        self.messages.extend(patch.append_messages);
        if let Some(keep) = patch.evict_to_last {
            if self.messages.len() > keep {
                let cut = self.messages.len() - keep;
                self.messages.drain(..cut);
            }
        }
        if let Some(summary) = patch.summary {
            self.summary = summary;
        }
        if let Some(workflow) = patch.workflow {
            self.workflow = workflow;
        }
        if let Some(memory_context) = patch.memory_context {
            self.memory_context = memory_context;
        }
        if let Some(activity) = patch.current_activity {
            self.current_activity = activity;
        }
        if let Some(apply) = patch.apply_activity {
            self.apply_activity = apply;
        }
        if let Some(path) = patch.image_path {
            self.image_path = Some(path);
        }
        if let Some(audio) = patch.audio {
            self.audio = Some(audio);
        }
        if let Some(call) = patch.call {
            self.call = Some(call);
        }
    }

    /// The latest assistant message, if the turn produced one.
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Trailing window of messages, at most `n`.
    pub fn recent_messages(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

/// Partial state update returned by a node. Nodes receive the state as a
/// read-only snapshot and communicate changes exclusively through this.
#[derive(Debug, Default)]
pub struct StatePatch {
    pub append_messages: Vec<ChatMessage>,
    /// Keep only the last N messages. Only the summarizer sets this.
    pub evict_to_last: Option<usize>,
    pub summary: Option<String>,
    pub workflow: Option<Workflow>,
    pub memory_context: Option<String>,
    pub current_activity: Option<String>,
    pub apply_activity: Option<bool>,
    pub image_path: Option<String>,
    pub audio: Option<Vec<u8>>,
    pub call: Option<CallInfo>,
}

impl StatePatch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn append(message: ChatMessage) -> Self {
        Self {
            append_messages: vec![message],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_appends_then_evicts() {
        let mut state = ConversationState::new("t1", "u1");
        for i in 0..10 {
            state.apply(StatePatch::append(ChatMessage::user(format!("m{i}"))));
        }
        assert_eq!(state.messages.len(), 10);

        let patch = StatePatch {
            evict_to_last: Some(3),
            summary: Some("so far".into()),
            ..StatePatch::default()
        };
        state.apply(patch);
        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.messages[0].content, "m7");
        assert_eq!(state.summary, "so far");
    }

    #[test]
    fn scalars_overwrite() {
        let mut state = ConversationState::new("t1", "u1");
        state.apply(StatePatch {
            workflow: Some(Workflow::Image),
            ..StatePatch::default()
        });
        assert_eq!(state.workflow, Workflow::Image);
    }

    #[test]
    fn workflow_label_is_strict() {
        assert_eq!(Workflow::parse_label("voice_call"), Some(Workflow::VoiceCall));
        assert_eq!(Workflow::parse_label(" image "), Some(Workflow::Image));
        assert_eq!(Workflow::parse_label("img"), None);
        assert_eq!(Workflow::parse_label("conversation or image"), None);
    }
}
