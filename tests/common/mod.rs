// tests/common/mod.rs
// Deterministic doubles for the network-facing collaborators, plus an
// engine builder the integration tests share.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use companion::graph::state::{CallInfo, ChatMessage};
use companion::graph::{Engine, EngineSettings, Responders};
use companion::llm::embeddings::cosine_similarity;
use companion::llm::{ChatModel, EmbeddingModel};
use companion::media::{CallService, ImageGenerator, SpeechSynthesizer};
use companion::memory::{MemoryHit, MemoryManager, MemoryRecord, VectorStore};
use companion::router::Router;
use companion::summarizer::Summarizer;

// ── Chat model double ──────────────────────────────────────────────

/// Replays scripted replies in order, then a fallback if one is set.
/// Records every call so tests can assert on prompts.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    fail: bool,
    pub calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl ScriptedChat {
    pub fn answering(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply.to_string()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn script<I: IntoIterator<Item = S>, S: Into<String>>(replies: I) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fallback: None,
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: None,
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), messages.to_vec()));
        if self.fail {
            return Err(anyhow!("scripted failure"));
        }
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return Ok(reply);
        }
        self.fallback
            .clone()
            .ok_or_else(|| anyhow!("scripted replies exhausted"))
    }
}

// ── Embedding double ───────────────────────────────────────────────

/// Embeds text as keyword counts over a small fixed vocabulary. Texts
/// sharing vocabulary words score high, disjoint texts score zero, and
/// identical texts score exactly 1.0, so dedup thresholds behave predictably.
pub struct StubEmbedder;

const VOCAB: [&str; 8] = [
    "teacher", "math", "dog", "juno", "tennis", "lisbon", "works", "weekends",
];

fn bag_of_words(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v = vec![0.0f32; VOCAB.len()];
    for word in lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if let Some(idx) = VOCAB.iter().position(|k| *k == word) {
            v[idx] += 1.0;
        }
    }
    v
}

#[async_trait]
impl EmbeddingModel for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(bag_of_words(text))
    }

    fn dimensions(&self) -> usize {
        VOCAB.len()
    }
}

// ── Vector store doubles ───────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryVectorStore {
    records: Mutex<Vec<(MemoryRecord, Vec<f32>)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.text.clone())
            .collect()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn store(&self, record: &MemoryRecord) -> Result<()> {
        let vector = bag_of_words(&record.text);
        let mut records = self.records.lock().unwrap();
        if let Some(slot) = records.iter_mut().find(|(r, _)| r.id == record.id) {
            *slot = (record.clone(), vector);
        } else {
            records.push((record.clone(), vector));
        }
        Ok(())
    }

    async fn find_similar(&self, user_id: &str, text: &str) -> Result<Option<MemoryHit>> {
        Ok(self.search(user_id, text, 1).await?.pop())
    }

    async fn search(&self, user_id: &str, query: &str, k: usize) -> Result<Vec<MemoryHit>> {
        let query_vec = bag_of_words(query);
        let mut hits: Vec<MemoryHit> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r.user_id == user_id)
            .map(|(r, v)| MemoryHit {
                record: r.clone(),
                score: cosine_similarity(&query_vec, v),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}

pub struct FailingVectorStore;

#[async_trait]
impl VectorStore for FailingVectorStore {
    async fn store(&self, _record: &MemoryRecord) -> Result<()> {
        Err(anyhow!("store unavailable"))
    }

    async fn find_similar(&self, _user_id: &str, _text: &str) -> Result<Option<MemoryHit>> {
        Err(anyhow!("store unavailable"))
    }

    async fn search(&self, _user_id: &str, _query: &str, _k: usize) -> Result<Vec<MemoryHit>> {
        Err(anyhow!("store unavailable"))
    }
}

// ── Media doubles ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockImageGenerator {
    pub requests: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate(&self, prompt: &str, path: &str) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), path.to_string()));
        Ok(())
    }
}

pub struct MockSpeechSynthesizer;

#[async_trait]
impl SpeechSynthesizer for MockSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

#[derive(Default)]
pub struct MockCallService {
    pub calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl CallService for MockCallService {
    async fn initiate(&self, phone_number: &str, context: &str) -> Result<CallInfo> {
        self.calls
            .lock()
            .unwrap()
            .push((phone_number.to_string(), context.to_string()));
        Ok(CallInfo {
            call_id: "call-1".to_string(),
            status: "queued".to_string(),
            initiated_at: chrono::Utc::now(),
        })
    }
}

// ── Canned classifier replies ──────────────────────────────────────

pub const ROUTE_CONVERSATION: &str = r#"{"response_type": "conversation"}"#;
pub const ROUTE_IMAGE: &str = r#"{"response_type": "image"}"#;
pub const ROUTE_AUDIO: &str = r#"{"response_type": "audio"}"#;
pub const ROUTE_VOICE_CALL: &str = r#"{"response_type": "voice_call"}"#;
pub const NOT_IMPORTANT: &str = r#"{"is_important": false, "formatted_memory": null}"#;

// ── Engine assembly ────────────────────────────────────────────────

pub struct TestEngine {
    pub engine: Engine,
    pub image: Arc<MockImageGenerator>,
    pub call: Arc<MockCallService>,
}

pub struct EngineConfig {
    pub reply: Arc<ScriptedChat>,
    pub router: Arc<ScriptedChat>,
    pub classifier: Arc<ScriptedChat>,
    pub summarizer: Arc<ScriptedChat>,
    pub summary_trigger: usize,
}

impl EngineConfig {
    /// Plain-conversation engine that never extracts memories.
    pub fn conversational(reply: Arc<ScriptedChat>) -> Self {
        Self {
            reply,
            router: ScriptedChat::answering(ROUTE_CONVERSATION),
            classifier: ScriptedChat::answering(NOT_IMPORTANT),
            summarizer: ScriptedChat::answering("Summary of everything so far."),
            summary_trigger: 20,
        }
    }

    pub fn with_router(mut self, router: Arc<ScriptedChat>) -> Self {
        self.router = router;
        self
    }

    pub fn build(self) -> TestEngine {
        let store = Arc::new(InMemoryVectorStore::new());
        let memory = Arc::new(MemoryManager::new(store, self.classifier, 0.9, 3));
        let router = Router::new(self.router, 3, 1);
        let summarizer = Summarizer::new(self.summarizer, 5);

        let image = Arc::new(MockImageGenerator::default());
        let call = Arc::new(MockCallService::default());
        let responders = Responders {
            chat: self.reply,
            image: image.clone(),
            speech: Arc::new(MockSpeechSynthesizer),
            call: call.clone(),
        };

        let engine = Engine::new(
            router,
            memory,
            summarizer,
            responders,
            EngineSettings {
                summary_trigger: self.summary_trigger,
                memory_context_window: 3,
                images_dir: "test_images".to_string(),
            },
        );

        TestEngine { engine, image, call }
    }
}
