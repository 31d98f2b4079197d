// src/summarizer/mod.rs
// Compacts overflow history into a running summary.

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::graph::state::{ChatMessage, ConversationState, StatePatch};
use crate::llm::ChatModel;

/// Folds everything except the last `keep_last` messages into the running
/// summary. An existing summary is always extended, never discarded.
pub struct Summarizer {
    model: Arc<dyn ChatModel>,
    keep_last: usize,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ChatModel>, keep_last: usize) -> Self {
        Self { model, keep_last }
    }

    pub fn keep_last(&self) -> usize {
        self.keep_last
    }

    /// Produce the new summary and the eviction marker. The patch keeps the
    /// last `keep_last` messages verbatim; everything older is subsumed by
    /// the summary text.
    pub async fn compact(&self, state: &ConversationState) -> Result<StatePatch> {
        if state.messages.len() <= self.keep_last {
            return Ok(StatePatch::empty());
        }

        let instruction = if state.summary.is_empty() {
            "Create a summary of the conversation above between the assistant and \
             the user. It must be a short description of the conversation so far \
             that captures all the relevant information shared."
                .to_string()
        } else {
            format!(
                "This is the summary of the conversation to date between the \
                 assistant and the user: {}\n\nExtend the summary by taking into \
                 account the new messages above.",
                state.summary
            )
        };

        let mut messages: Vec<ChatMessage> = state.messages.clone();
        messages.push(ChatMessage::user(instruction));

        let summary = self
            .model
            .complete("You summarize conversations faithfully and concisely.", &messages)
            .await?
            .trim()
            .to_string();

        if summary.is_empty() {
            return Err(anyhow!("summarizer produced empty output"));
        }

        Ok(StatePatch {
            summary: Some(summary),
            evict_to_last: Some(self.keep_last),
            ..StatePatch::default()
        })
    }
}
