// src/graph/mod.rs
// Turn engine. A turn is a walk over the stage graph: each stage reads an
// immutable snapshot of the conversation state, returns a patch, and the
// engine merges patches in order. State is committed back to the session
// only after the whole walk succeeds.

pub mod edges;
pub mod nodes;
pub mod state;

use std::sync::Arc;

use crate::error::TurnError;
use crate::llm::ChatModel;
use crate::media::{CallService, ImageGenerator, SpeechSynthesizer};
use crate::memory::MemoryManager;
use crate::router::Router;
use crate::session::Sessions;
use crate::summarizer::Summarizer;

use edges::Next;
use state::{ConversationState, StatePatch};

/// The outbound channels a turn can respond on.
pub struct Responders {
    pub chat: Arc<dyn ChatModel>,
    pub image: Arc<dyn ImageGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub call: Arc<dyn CallService>,
}

/// Knobs the engine needs beyond its collaborators.
pub struct EngineSettings {
    /// Compaction fires when the message count exceeds this.
    pub summary_trigger: usize,
    /// Trailing messages used as the memory retrieval query.
    pub memory_context_window: usize,
    /// Directory generated images are written into.
    pub images_dir: String,
}

/// Identity of the turn being processed. Threads are created on first use;
/// identity fields are fixed for the lifetime of the thread.
pub struct TurnRequest {
    pub thread_id: String,
    pub user_id: String,
    pub phone_number: Option<String>,
}

pub struct Engine {
    router: Router,
    memory: Arc<MemoryManager>,
    summarizer: Summarizer,
    responders: Responders,
    sessions: Sessions,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        router: Router,
        memory: Arc<MemoryManager>,
        summarizer: Summarizer,
        responders: Responders,
        settings: EngineSettings,
    ) -> Self {
        Self {
            router,
            memory,
            summarizer,
            responders,
            sessions: Sessions::new(),
            settings,
        }
    }

    /// Run one full turn. The per-thread lock is held for the whole walk, so
    /// concurrent messages on the same thread serialize in arrival order
    /// while distinct threads proceed in parallel. On any stage failure the
    /// session keeps its pre-turn state.
    pub async fn invoke(
        &self,
        initial: StatePatch,
        turn: &TurnRequest,
    ) -> Result<ConversationState, TurnError> {
        let handle = self
            .sessions
            .entry(&turn.thread_id, &turn.user_id, turn.phone_number.as_deref())
            .await;
        let mut guard = handle.lock().await;

        let mut working = guard.clone();
        working.begin_turn();
        working.apply(initial);

        let mut stage = edges::entry();
        loop {
            tracing::debug!(thread_id = %turn.thread_id, stage = stage.name(), "running stage");
            let patch = self
                .run_stage(stage, &working)
                .await
                .map_err(|source| TurnError::Stage {
                    stage: stage.name(),
                    source,
                })?;
            working.apply(patch);

            match edges::next(stage, &working, self.settings.summary_trigger) {
                Next::Stage(next) => stage = next,
                Next::End => break,
            }
        }

        *guard = working.clone();
        Ok(working)
    }

    /// Read-only view of a thread's committed state.
    pub async fn snapshot(&self, thread_id: &str) -> Option<ConversationState> {
        self.sessions.snapshot(thread_id).await
    }
}
