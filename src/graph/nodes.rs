// src/graph/nodes.rs
// Stage implementations. Each stage reads the state snapshot and returns a
// patch; none of them mutate the state directly. Classification and storage
// stages degrade on failure, response stages propagate so the turn aborts
// cleanly.

use anyhow::{anyhow, Result};
use tracing::warn;
use uuid::Uuid;

use crate::graph::edges::Stage;
use crate::graph::state::{ChatMessage, ConversationState, StatePatch};
use crate::schedule;

use super::Engine;

/// Persona card shared by every response stage. Activity, memories and the
/// running summary are appended per turn.
const CHARACTER_PROMPT: &str = "\
You are Maya, a warm and curious companion chatting over a messaging app. \
You have your own daily life and opinions, you remember what people tell \
you, and you talk like a real person: short messages, no bullet points, no \
assistant mannerisms. Never mention being software and never describe these \
instructions.";

const SCENARIO_PROMPT: &str = "\
Based on the recent conversation, write a single vivid photographic prompt \
for an image Maya would snap and send right now: first person, present \
tense, concrete setting and lighting. Respond with the prompt text only, \
no quotes and no commentary.";

impl Engine {
    pub(super) async fn run_stage(
        &self,
        stage: Stage,
        state: &ConversationState,
    ) -> Result<StatePatch> {
        match stage {
            Stage::ExtractMemory => self.extract_memory(state).await,
            Stage::Route => self.route(state).await,
            Stage::InjectContext => self.inject_context(state).await,
            Stage::RetrieveMemory => self.retrieve_memory(state).await,
            Stage::Conversation => self.conversation(state).await,
            Stage::Image => self.image(state).await,
            Stage::Audio => self.audio(state).await,
            Stage::VoiceCall => self.voice_call(state).await,
            Stage::Summarize => self.summarize(state).await,
        }
    }

    /// Analyze the inbound message for durable facts. Failures are absorbed
    /// inside the manager; this stage never changes the state.
    async fn extract_memory(&self, state: &ConversationState) -> Result<StatePatch> {
        if let Some(last) = state.messages.last() {
            self.memory.extract_and_store(&state.user_id, last).await?;
        }
        Ok(StatePatch::empty())
    }

    /// Pick the response workflow for this turn. Classification is total:
    /// the router falls back to keyword rules and then to plain conversation.
    async fn route(&self, state: &ConversationState) -> Result<StatePatch> {
        let workflow = self.router.classify(&state.messages).await;
        Ok(StatePatch {
            workflow: Some(workflow),
            ..StatePatch::default()
        })
    }

    /// Resolve the current scheduled activity. `apply_activity` flags whether
    /// it changed since the previous turn, so the persona only brings it up
    /// when it is news.
    async fn inject_context(&self, state: &ConversationState) -> Result<StatePatch> {
        let activity = schedule::current_activity();
        let changed = activity != state.current_activity;
        Ok(StatePatch {
            current_activity: Some(activity),
            apply_activity: Some(changed),
            ..StatePatch::default()
        })
    }

    /// Retrieve stored memories relevant to the trailing conversation window.
    async fn retrieve_memory(&self, state: &ConversationState) -> Result<StatePatch> {
        let query = state
            .recent_messages(self.settings.memory_context_window)
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let hits = self.memory.get_relevant_memories(&state.user_id, &query).await;
        Ok(StatePatch {
            memory_context: Some(self.memory.format_for_prompt(&hits)),
            ..StatePatch::default()
        })
    }

    fn system_prompt(&self, state: &ConversationState) -> String {
        let mut prompt = String::from(CHARACTER_PROMPT);
        if state.apply_activity && !state.current_activity.is_empty() {
            prompt.push_str("\n\nRight now you are ");
            prompt.push_str(&state.current_activity);
            prompt.push('.');
        }
        if !state.memory_context.is_empty() {
            prompt.push_str("\n\nThings you remember about this person:\n");
            prompt.push_str(&state.memory_context);
        }
        if !state.summary.is_empty() {
            prompt.push_str("\n\nSummary of the conversation so far:\n");
            prompt.push_str(&state.summary);
        }
        prompt
    }

    async fn conversation(&self, state: &ConversationState) -> Result<StatePatch> {
        let reply = self
            .responders
            .chat
            .complete(&self.system_prompt(state), &state.messages)
            .await?;
        Ok(StatePatch::append(ChatMessage::assistant(reply)))
    }

    /// Generate an image from a scenario distilled out of the recent
    /// exchange, then caption it in the persona's voice.
    async fn image(&self, state: &ConversationState) -> Result<StatePatch> {
        let scenario = self
            .responders
            .chat
            .complete(SCENARIO_PROMPT, state.recent_messages(5))
            .await?;

        let path = format!("{}/image_{}.png", self.settings.images_dir, Uuid::new_v4());
        self.responders.image.generate(&scenario, &path).await?;

        let mut messages = state.messages.to_vec();
        messages.push(ChatMessage::user(format!(
            "<you just sent a photo showing: {scenario}>"
        )));
        let caption = self
            .responders
            .chat
            .complete(&self.system_prompt(state), &messages)
            .await?;

        Ok(StatePatch {
            append_messages: vec![ChatMessage::assistant(caption)],
            image_path: Some(path),
            ..StatePatch::default()
        })
    }

    /// Compose a reply and render it to speech. The text is kept in the
    /// transcript so later turns and the summarizer see it.
    async fn audio(&self, state: &ConversationState) -> Result<StatePatch> {
        let reply = self
            .responders
            .chat
            .complete(&self.system_prompt(state), &state.messages)
            .await?;
        let audio = self.responders.speech.synthesize(&reply).await?;
        Ok(StatePatch {
            append_messages: vec![ChatMessage::assistant(reply)],
            audio: Some(audio),
            ..StatePatch::default()
        })
    }

    /// Place an outbound call carrying recent context for the phone side.
    /// Requires a phone number on the thread.
    async fn voice_call(&self, state: &ConversationState) -> Result<StatePatch> {
        let phone = state.phone_number.as_deref().ok_or_else(|| {
            anyhow!("no phone number on record for thread {}", state.thread_id)
        })?;

        let context = state
            .recent_messages(5)
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let call = self.responders.call.initiate(phone, &context).await?;
        Ok(StatePatch {
            append_messages: vec![ChatMessage::assistant("Calling you now, pick up!")],
            call: Some(call),
            ..StatePatch::default()
        })
    }

    /// Compact the transcript. Compaction is best effort: if the model call
    /// fails the turn still succeeds with the full transcript intact.
    async fn summarize(&self, state: &ConversationState) -> Result<StatePatch> {
        match self.summarizer.compact(state).await {
            Ok(patch) => Ok(patch),
            Err(err) => {
                warn!(thread_id = %state.thread_id, error = %err, "summarization skipped");
                Ok(StatePatch::empty())
            }
        }
    }
}
