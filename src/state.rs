// src/state.rs
// Wires configured clients into the turn engine. Everything is built once at
// startup and shared behind Arc; no globals.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::CompanionConfig;
use crate::graph::{Engine, EngineSettings, Responders};
use crate::llm::embeddings::EmbeddingClient;
use crate::llm::groq::GroqClient;
use crate::media::{ElevenLabsSpeechClient, TogetherImageClient, VapiCallClient};
use crate::memory::{MemoryManager, QdrantVectorStore};
use crate::router::Router;
use crate::summarizer::Summarizer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub fn build_app_state(config: &CompanionConfig) -> Result<AppState> {
    let http = reqwest::Client::builder()
        .timeout(config.llm_timeout_duration())
        .build()
        .context("failed to build shared HTTP client")?;

    let chat = Arc::new(GroqClient::new(
        config.groq_api_key.clone(),
        config.groq_base_url.clone(),
        config.text_model.clone(),
        config.llm_timeout_duration(),
        config.llm_max_retries,
    )?);
    // Classification calls run on the smaller model at low temperature.
    let classifier = Arc::new(chat.with_model(config.small_text_model.clone(), 0.1));

    let embedder = Arc::new(EmbeddingClient::new(
        config.embeddings_api_key.clone(),
        config.embeddings_base_url.clone(),
        config.embeddings_model.clone(),
        config.embedding_dim,
        config.llm_timeout_duration(),
    )?);

    let store = Arc::new(QdrantVectorStore::new(
        http.clone(),
        config.qdrant_url.clone(),
        config.qdrant_api_key.clone(),
        config.qdrant_collection.clone(),
        embedder,
    ));

    let memory = Arc::new(MemoryManager::new(
        store,
        classifier.clone(),
        config.dedup_similarity_threshold,
        config.memory_top_k,
    ));

    let router = Router::new(
        classifier,
        config.router_messages_to_analyze,
        config.llm_max_retries,
    );

    let summarizer = Summarizer::new(chat.clone(), config.total_messages_after_summary);

    let responders = Responders {
        chat,
        image: Arc::new(TogetherImageClient::new(
            http.clone(),
            config.together_api_key.clone(),
            config.image_model.clone(),
        )),
        speech: Arc::new(ElevenLabsSpeechClient::new(
            http.clone(),
            config.elevenlabs_api_key.clone(),
            config.elevenlabs_voice_id.clone(),
            config.tts_model.clone(),
        )),
        call: Arc::new(VapiCallClient::new(
            http,
            config.vapi_api_key.clone(),
            config.vapi_phone_number_id.clone(),
            config.vapi_assistant_id.clone(),
        )),
    };

    let engine = Engine::new(
        router,
        memory,
        summarizer,
        responders,
        EngineSettings {
            summary_trigger: config.total_messages_summary_trigger,
            memory_context_window: config.router_messages_to_analyze,
            images_dir: config.images_dir.clone(),
        },
    );

    Ok(AppState {
        engine: Arc::new(engine),
    })
}
