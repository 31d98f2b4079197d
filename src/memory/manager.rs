// src/memory/manager.rs

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::graph::state::{ChatMessage, Role};
use crate::llm::ChatModel;
use crate::memory::types::{MemoryAnalysis, MemoryHit, MemoryRecord};
use crate::memory::vector_store::VectorStore;

const MEMORY_ANALYSIS_PROMPT: &str = "\
You extract important personal facts from a user message.\n\
Remember: personal details, profession, preferences, life circumstances, \
experiences, goals. Ignore: small talk, requests, questions about the \
assistant, generic conversation.\n\
Format facts in third person, present tense, with conversational filler \
stripped. Example: \"I am a teacher\" becomes \"Is a teacher\".\n\
Respond with JSON only, exactly this shape:\n\
{\"is_important\": true|false, \"formatted_memory\": \"Third-person fact\" or null}";

/// Decides what is worth remembering about a user, deduplicates against the
/// vector store, and retrieves memory text for the current conversation.
pub struct MemoryManager {
    store: Arc<dyn VectorStore>,
    classifier: Arc<dyn ChatModel>,
    dedup_threshold: f32,
    top_k: usize,
    classifier_retries: u32,
}

impl MemoryManager {
    pub fn new(
        store: Arc<dyn VectorStore>,
        classifier: Arc<dyn ChatModel>,
        dedup_threshold: f32,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            classifier,
            dedup_threshold,
            top_k,
            classifier_retries: 2,
        }
    }

    /// Analyze one inbound message and persist anything worth keeping.
    ///
    /// Never fails the turn: classifier trouble skips the extraction, a
    /// storage failure drops the single write. Both are logged.
    pub async fn extract_and_store(&self, user_id: &str, message: &ChatMessage) -> Result<()> {
        if message.role != Role::User {
            return Ok(());
        }

        let analysis = match self.analyze(&message.content).await {
            Ok(a) => a,
            Err(e) => {
                warn!("memory analysis failed, skipping extraction: {}", e);
                return Ok(());
            }
        };

        let Some(fact) = analysis.formatted_memory.filter(|_| analysis.is_important) else {
            return Ok(());
        };

        let record = match self.store.find_similar(user_id, &fact).await {
            Ok(Some(hit)) if hit.score >= self.dedup_threshold => {
                debug!(
                    "near-duplicate of '{}' (score {:.2}), updating in place",
                    hit.record.text, hit.score
                );
                MemoryRecord::update_of(hit.record.id, user_id, &fact)
            }
            Ok(_) => MemoryRecord::new(user_id, &fact),
            Err(e) => {
                warn!("dedup lookup failed, inserting fresh record: {}", e);
                MemoryRecord::new(user_id, &fact)
            }
        };

        match self.store.store(&record).await {
            Ok(()) => info!("stored memory: '{}'", record.text),
            // A lost memory write must never fail the user-facing turn.
            Err(e) => warn!("memory write dropped: {}", e),
        }
        Ok(())
    }

    /// Retrieve the memories most relevant to `context`, best first.
    ///
    /// Store unavailability degrades to an empty list.
    pub async fn get_relevant_memories(&self, user_id: &str, context: &str) -> Vec<MemoryHit> {
        match self.store.search(user_id, context, self.top_k).await {
            Ok(hits) => {
                for hit in &hits {
                    debug!("memory: '{}' (score {:.2})", hit.record.text, hit.score);
                }
                hits
            }
            Err(e) => {
                warn!("memory retrieval failed, continuing without context: {}", e);
                Vec::new()
            }
        }
    }

    /// Bullet list of fact strings for the response prompt; empty string
    /// when there is nothing to inject.
    pub fn format_for_prompt(&self, hits: &[MemoryHit]) -> String {
        hits.iter()
            .map(|h| format!("- {}", h.record.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn analyze(&self, message: &str) -> Result<MemoryAnalysis> {
        let prompt_message = ChatMessage::user(message);
        let mut last_err = None;
        for _ in 0..=self.classifier_retries {
            let raw = self
                .classifier
                .complete(MEMORY_ANALYSIS_PROMPT, std::slice::from_ref(&prompt_message))
                .await?;
            match parse_analysis(&raw) {
                Ok(analysis) => return Ok(analysis),
                Err(e) => {
                    warn!("memory analysis output malformed, retrying: {}", e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("memory analysis failed")))
    }
}

fn parse_analysis(raw: &str) -> Result<MemoryAnalysis> {
    let json_str = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let value: Value = serde_json::from_str(json_str)?;
    let is_important = value
        .get("is_important")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| anyhow!("missing is_important"))?;
    let formatted_memory = value
        .get("formatted_memory")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(MemoryAnalysis {
        is_important,
        formatted_memory,
    })
}
