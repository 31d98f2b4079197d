// src/router/mod.rs
// Classifies the last few turns into a response modality.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::graph::state::{ChatMessage, Role, Workflow};
use crate::llm::ChatModel;

const ROUTER_PROMPT: &str = "\
You decide how the assistant should respond to the conversation so far.\n\
Labels:\n\
- conversation: normal chatting, questions, advice. The default.\n\
- image: the user explicitly asks to be sent or shown a picture.\n\
- audio: the user explicitly asks for a voice message or recording.\n\
- voice_call: the user explicitly asks to be called on the phone.\n\
Be conservative: mentioning something visual, a voice, or a phone is not a \
request for it. When in doubt choose conversation.\n\
Respond with JSON only, exactly this shape:\n\
{\"response_type\": \"conversation\" | \"image\" | \"audio\" | \"voice_call\"}";

/// Router over a bounded trailing window of messages. Total by construction:
/// schema failures are retried a bounded number of times, then a
/// deterministic keyword pass runs, then `conversation`.
pub struct Router {
    model: Arc<dyn ChatModel>,
    window: usize,
    max_retries: u32,
}

impl Router {
    pub fn new(model: Arc<dyn ChatModel>, window: usize, max_retries: u32) -> Self {
        Self {
            model,
            window,
            max_retries,
        }
    }

    /// Classify the conversation. Never fails and never returns anything
    /// outside the four labels; routing ambiguity must not abort a turn.
    pub async fn classify(&self, messages: &[ChatMessage]) -> Workflow {
        let start = messages.len().saturating_sub(self.window);
        let window = &messages[start..];

        for attempt in 0..=self.max_retries {
            match self.model.complete(ROUTER_PROMPT, window).await {
                Ok(raw) => match parse_response_type(&raw) {
                    Ok(workflow) => {
                        debug!("router chose {} (attempt {})", workflow.as_str(), attempt + 1);
                        return workflow;
                    }
                    Err(e) => warn!("router output malformed (attempt {}): {}", attempt + 1, e),
                },
                Err(e) => warn!("router call failed (attempt {}): {}", attempt + 1, e),
            }
        }

        let fallback = keyword_fallback(window);
        warn!("router falling back to keyword match: {}", fallback.as_str());
        fallback
    }
}

fn parse_response_type(raw: &str) -> Result<Workflow> {
    let json_str = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| anyhow!("not valid JSON: {}", e))?;
    let label = value
        .get("response_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("missing response_type"))?;
    Workflow::parse_label(label).ok_or_else(|| anyhow!("unknown label: {}", label))
}

/// Deterministic last resort when the model cannot produce a valid label.
/// Only unambiguous request phrasing selects a media label; everything else
/// is conversation, which mirrors the conservative bias of the prompt.
fn keyword_fallback(window: &[ChatMessage]) -> Workflow {
    let Some(last_user) = window.iter().rev().find(|m| m.role == Role::User) else {
        return Workflow::Conversation;
    };
    let text = last_user.content.to_lowercase();

    let call_phrases = ["call me", "phone me", "give me a call", "ring me", "give me a ring"];
    if call_phrases.iter().any(|p| text.contains(p)) {
        return Workflow::VoiceCall;
    }

    let image_phrases = ["send me a picture", "send a picture", "send me a photo", "show me a picture", "send me an image"];
    if image_phrases.iter().any(|p| text.contains(p)) {
        return Workflow::Image;
    }

    let audio_phrases = ["voice message", "voice note", "send me audio", "record something for me"];
    if audio_phrases.iter().any(|p| text.contains(p)) {
        return Workflow::Audio;
    }

    Workflow::Conversation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_four_labels() {
        for label in ["conversation", "image", "audio", "voice_call"] {
            let raw = format!("{{\"response_type\": \"{label}\"}}");
            assert_eq!(parse_response_type(&raw).unwrap().as_str(), label);
        }
    }

    #[test]
    fn rejects_unknown_label_and_prose() {
        assert!(parse_response_type("{\"response_type\": \"video\"}").is_err());
        assert!(parse_response_type("I think an image would be nice").is_err());
    }

    #[test]
    fn fallback_requires_explicit_request() {
        let msgs = vec![ChatMessage::user("I'm imagining you at work right now")];
        assert_eq!(keyword_fallback(&msgs), Workflow::Conversation);

        let msgs = vec![ChatMessage::user("Can you send me a picture of that?")];
        assert_eq!(keyword_fallback(&msgs), Workflow::Image);

        let msgs = vec![ChatMessage::user("please call me when you can")];
        assert_eq!(keyword_fallback(&msgs), Workflow::VoiceCall);
    }
}
