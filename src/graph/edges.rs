// src/graph/edges.rs
// Transition logic. Stages form a closed enum so an invalid transition
// cannot be expressed, and every conditional edge is a pure function of the
// state snapshot.

use crate::graph::state::{ConversationState, Workflow};

/// The named stages of the turn pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExtractMemory,
    Route,
    InjectContext,
    RetrieveMemory,
    Conversation,
    Image,
    Audio,
    VoiceCall,
    Summarize,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ExtractMemory => "extract_memory",
            Stage::Route => "route",
            Stage::InjectContext => "inject_context",
            Stage::RetrieveMemory => "retrieve_memory",
            Stage::Conversation => "conversation",
            Stage::Image => "image",
            Stage::Audio => "audio",
            Stage::VoiceCall => "voice_call",
            Stage::Summarize => "summarize",
        }
    }
}

/// Outcome of an edge: another stage, or the end of the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Stage(Stage),
    End,
}

/// Entry point of every turn.
pub fn entry() -> Stage {
    Stage::ExtractMemory
}

/// Dispatch to the response stage chosen by the router.
pub fn select_workflow(state: &ConversationState) -> Stage {
    match state.workflow {
        Workflow::Conversation => Stage::Conversation,
        Workflow::Image => Stage::Image,
        Workflow::Audio => Stage::Audio,
        Workflow::VoiceCall => Stage::VoiceCall,
    }
}

/// Compaction fires strictly above the trigger, after a response stage.
pub fn should_summarize(state: &ConversationState, trigger: usize) -> Next {
    if state.messages.len() > trigger {
        Next::Stage(Stage::Summarize)
    } else {
        Next::End
    }
}

/// The full transition table: fixed edges plus the two conditional ones.
/// voice_call never summarizes; the call hands the conversation off to the
/// phone side.
pub fn next(stage: Stage, state: &ConversationState, summary_trigger: usize) -> Next {
    match stage {
        Stage::ExtractMemory => Next::Stage(Stage::Route),
        Stage::Route => Next::Stage(Stage::InjectContext),
        Stage::InjectContext => Next::Stage(Stage::RetrieveMemory),
        Stage::RetrieveMemory => Next::Stage(select_workflow(state)),
        Stage::Conversation | Stage::Image | Stage::Audio => {
            should_summarize(state, summary_trigger)
        }
        Stage::VoiceCall => Next::End,
        Stage::Summarize => Next::End,
    }
}
