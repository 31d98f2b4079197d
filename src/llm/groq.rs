// src/llm/groq.rs
// Chat-completions client for Groq's OpenAI-compatible endpoint.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use crate::graph::state::ChatMessage;
use crate::llm::ChatModel;

#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl GroqClient {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for Groq")?;
        Ok(Self {
            client,
            api_key,
            base_url,
            model,
            temperature: 0.7,
            max_retries,
        })
    }

    /// Same client, different model/temperature. Used for the cheaper
    /// classification calls (router, memory importance).
    pub fn with_model<S: Into<String>>(&self, model: S, temperature: f32) -> Self {
        let mut c = self.clone();
        c.model = model.into();
        c.temperature = temperature;
        c
    }

    async fn chat_once(&self, payload: &Value) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(payload)
            .send()
            .await
            .context("failed to send chat request")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("chat API error {}: {}", status, body));
        }

        let body: Value = resp.json().await.context("failed to parse chat response")?;
        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("no content in chat response"))?;
        Ok(text.to_string())
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let mut chat_messages = vec![json!({ "role": "system", "content": system })];
        for m in messages {
            chat_messages.push(json!({ "role": m.role.as_str(), "content": m.content }));
        }

        let payload = json!({
            "model": self.model,
            "messages": chat_messages,
            "temperature": self.temperature,
        });

        // Bounded retry at the call site; the caller sees only the final error.
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            match self.chat_once(&payload).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("chat attempt {}/{} failed: {}", attempt + 1, self.max_retries + 1, e);
                    last_err = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(250 * (attempt as u64 + 1))).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("chat call failed")))
    }
}
