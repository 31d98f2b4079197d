// src/config/mod.rs
// All tunables come from the environment, loaded once at startup and passed
// down explicitly. Secrets have no defaults and fail startup when missing.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CompanionConfig {
    // ── Chat model
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub text_model: String,
    pub small_text_model: String,
    pub llm_timeout: u64,
    pub llm_max_retries: u32,

    // ── Embeddings
    pub embeddings_api_key: String,
    pub embeddings_base_url: String,
    pub embeddings_model: String,
    pub embedding_dim: usize,

    // ── Vector store
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,

    // ── Memory
    pub memory_top_k: usize,
    pub dedup_similarity_threshold: f32,

    // ── Routing
    pub router_messages_to_analyze: usize,

    // ── Summarization
    pub total_messages_summary_trigger: usize,
    pub total_messages_after_summary: usize,

    // ── Image generation
    pub together_api_key: String,
    pub image_model: String,
    pub images_dir: String,

    // ── Speech synthesis
    pub elevenlabs_api_key: String,
    pub elevenlabs_voice_id: String,
    pub tts_model: String,

    // ── Voice calls
    pub vapi_api_key: String,
    pub vapi_phone_number_id: String,
    pub vapi_assistant_id: String,

    // ── Server
    pub host: String,
    pub port: u16,

    // ── Logging
    pub log_level: String,
}

/// Parse an optional environment variable, tolerating trailing comments and
/// whitespace in .env values.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean = val.split('#').next().unwrap_or("").trim();
            clean.parse::<T>().unwrap_or(default)
        }
        Err(_) => default,
    }
}

/// Secrets and service identifiers have no sensible default.
fn required_var(key: &str) -> Result<String> {
    let val = std::env::var(key).with_context(|| format!("{key} is not set"))?;
    let clean = val.split('#').next().unwrap_or("").trim();
    if clean.is_empty() {
        anyhow::bail!("{key} is empty");
    }
    Ok(clean.to_string())
}

impl CompanionConfig {
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine in deployed environments.
        let _ = dotenvy::dotenv();

        Ok(Self {
            groq_api_key: required_var("GROQ_API_KEY")?,
            groq_base_url: env_var_or(
                "GROQ_BASE_URL",
                "https://api.groq.com/openai/v1".to_string(),
            ),
            text_model: env_var_or("TEXT_MODEL", "llama-3.3-70b-versatile".to_string()),
            small_text_model: env_var_or("SMALL_TEXT_MODEL", "llama-3.1-8b-instant".to_string()),
            llm_timeout: env_var_or("LLM_TIMEOUT", 60),
            llm_max_retries: env_var_or("LLM_MAX_RETRIES", 3),

            embeddings_api_key: required_var("EMBEDDINGS_API_KEY")?,
            embeddings_base_url: env_var_or(
                "EMBEDDINGS_BASE_URL",
                "https://api.openai.com/v1".to_string(),
            ),
            embeddings_model: env_var_or(
                "EMBEDDINGS_MODEL",
                "text-embedding-3-small".to_string(),
            ),
            embedding_dim: env_var_or("EMBEDDING_DIM", 1536),

            qdrant_url: env_var_or("QDRANT_URL", "http://localhost:6333".to_string()),
            qdrant_api_key: std::env::var("QDRANT_API_KEY").ok().filter(|v| !v.is_empty()),
            qdrant_collection: env_var_or("QDRANT_COLLECTION", "long_term_memory".to_string()),

            memory_top_k: env_var_or("MEMORY_TOP_K", 3),
            dedup_similarity_threshold: env_var_or("DEDUP_SIMILARITY_THRESHOLD", 0.9),

            router_messages_to_analyze: env_var_or("ROUTER_MESSAGES_TO_ANALYZE", 3),

            total_messages_summary_trigger: env_var_or("TOTAL_MESSAGES_SUMMARY_TRIGGER", 20),
            total_messages_after_summary: env_var_or("TOTAL_MESSAGES_AFTER_SUMMARY", 5),

            together_api_key: required_var("TOGETHER_API_KEY")?,
            image_model: env_var_or(
                "IMAGE_MODEL",
                "black-forest-labs/FLUX.1-schnell".to_string(),
            ),
            images_dir: env_var_or("IMAGES_DIR", "generated_images".to_string()),

            elevenlabs_api_key: required_var("ELEVENLABS_API_KEY")?,
            elevenlabs_voice_id: required_var("ELEVENLABS_VOICE_ID")?,
            tts_model: env_var_or("TTS_MODEL", "eleven_flash_v2_5".to_string()),

            vapi_api_key: required_var("VAPI_API_KEY")?,
            vapi_phone_number_id: required_var("VAPI_PHONE_NUMBER_ID")?,
            vapi_assistant_id: required_var("VAPI_ASSISTANT_ID")?,

            host: env_var_or("COMPANION_HOST", "0.0.0.0".to_string()),
            port: env_var_or("COMPANION_PORT", 8080),

            log_level: env_var_or("LOG_LEVEL", "info".to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn llm_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.llm_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_or_strips_comments_and_whitespace() {
        unsafe { std::env::set_var("TEST_COMPANION_PORT", " 9090 # local override") };
        let port: u16 = env_var_or("TEST_COMPANION_PORT", 8080);
        assert_eq!(port, 9090);
        unsafe { std::env::remove_var("TEST_COMPANION_PORT") };
    }

    #[test]
    fn env_var_or_falls_back_on_garbage() {
        unsafe { std::env::set_var("TEST_COMPANION_TOP_K", "not-a-number") };
        let k: usize = env_var_or("TEST_COMPANION_TOP_K", 3);
        assert_eq!(k, 3);
        unsafe { std::env::remove_var("TEST_COMPANION_TOP_K") };
    }

    #[test]
    fn required_var_rejects_missing_and_empty() {
        unsafe { std::env::remove_var("TEST_COMPANION_SECRET") };
        assert!(required_var("TEST_COMPANION_SECRET").is_err());

        unsafe { std::env::set_var("TEST_COMPANION_SECRET", "   ") };
        assert!(required_var("TEST_COMPANION_SECRET").is_err());
        unsafe { std::env::remove_var("TEST_COMPANION_SECRET") };
    }
}
