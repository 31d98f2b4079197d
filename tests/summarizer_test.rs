// tests/summarizer_test.rs

mod common;

use companion::graph::state::{ChatMessage, ConversationState, StatePatch};
use companion::summarizer::Summarizer;

use common::*;

fn state_with(turns: usize, summary: &str) -> ConversationState {
    let mut state = ConversationState::new("t1", "u1");
    for i in 0..turns {
        state.apply(StatePatch::append(ChatMessage::user(format!("question {i}"))));
        state.apply(StatePatch::append(ChatMessage::assistant(format!("answer {i}"))));
    }
    state.summary = summary.to_string();
    state
}

#[tokio::test]
async fn short_transcripts_are_left_alone() {
    let model = ScriptedChat::answering("should never be asked");
    let summarizer = Summarizer::new(model.clone(), 5);

    let patch = summarizer.compact(&state_with(2, "")).await.unwrap();
    assert!(patch.summary.is_none());
    assert!(patch.evict_to_last.is_none());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn fresh_summary_evicts_down_to_the_tail() {
    let model = ScriptedChat::answering("They introduced themselves and made plans.");
    let summarizer = Summarizer::new(model.clone(), 5);

    let mut state = state_with(12, "");
    let patch = summarizer.compact(&state).await.unwrap();
    assert_eq!(
        patch.summary.as_deref(),
        Some("They introduced themselves and made plans.")
    );
    assert_eq!(patch.evict_to_last, Some(5));

    state.apply(patch);
    assert_eq!(state.messages.len(), 5);
    // The tail keeps the most recent exchange.
    assert_eq!(state.messages.last().unwrap().content, "answer 11");

    // The model saw the whole transcript plus one instruction message.
    let calls = model.calls.lock().unwrap();
    assert_eq!(calls[0].1.len(), 25);
    assert!(calls[0].1.last().unwrap().content.contains("Create a summary"));
}

#[tokio::test]
async fn existing_summary_is_extended_not_replaced() {
    let model = ScriptedChat::answering("They met last week and now plan a trip.");
    let summarizer = Summarizer::new(model.clone(), 5);

    let state = state_with(10, "They met last week.");
    let patch = summarizer.compact(&state).await.unwrap();
    assert_eq!(
        patch.summary.as_deref(),
        Some("They met last week and now plan a trip.")
    );

    let calls = model.calls.lock().unwrap();
    let instruction = &calls[0].1.last().unwrap().content;
    assert!(instruction.contains("They met last week."));
    assert!(instruction.contains("Extend the summary"));
}

#[tokio::test]
async fn empty_model_output_is_an_error() {
    let model = ScriptedChat::answering("   ");
    let summarizer = Summarizer::new(model, 5);

    assert!(summarizer.compact(&state_with(10, "")).await.is_err());
}

#[tokio::test]
async fn model_failure_propagates() {
    let summarizer = Summarizer::new(ScriptedChat::failing(), 5);
    assert!(summarizer.compact(&state_with(10, "")).await.is_err());
}

#[tokio::test]
async fn repeated_compaction_stays_bounded() {
    let model = ScriptedChat::answering("running summary");
    let summarizer = Summarizer::new(model, 5);

    let mut state = state_with(12, "");
    for _ in 0..3 {
        let patch = summarizer.compact(&state).await.unwrap();
        state.apply(patch);
        state.apply(StatePatch::append(ChatMessage::user("more")));
        state.apply(StatePatch::append(ChatMessage::assistant("sure")));
    }

    assert_eq!(state.messages.len(), 7);
    assert_eq!(state.summary, "running summary");
}
