// src/media/speech.rs
// ElevenLabs text-to-speech.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::media::SpeechSynthesizer;

pub struct ElevenLabsSpeechClient {
    client: Client,
    api_key: String,
    voice_id: String,
    model: String,
}

impl ElevenLabsSpeechClient {
    pub fn new(client: Client, api_key: String, voice_id: String, model: String) -> Self {
        Self {
            client,
            api_key,
            voice_id,
            model,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            self.voice_id
        );
        let payload = json!({
            "text": text,
            "model_id": self.model,
        });

        let resp = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("speech synthesis request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("speech API error {}: {}", status, body));
        }

        let bytes = resp.bytes().await.context("failed to read audio body")?;
        Ok(bytes.to_vec())
    }
}
