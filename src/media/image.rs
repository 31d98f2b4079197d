// src/media/image.rs
// FLUX image generation through Together's inference API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

use crate::media::ImageGenerator;

pub struct TogetherImageClient {
    client: Client,
    api_key: String,
    model: String,
}

impl TogetherImageClient {
    pub fn new(client: Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ImageGenerator for TogetherImageClient {
    async fn generate(&self, prompt: &str, path: &str) -> Result<()> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "width": 1024,
            "height": 768,
            "steps": 4,
            "n": 1,
            "response_format": "b64_json",
        });

        let resp = self
            .client
            .post("https://api.together.xyz/v1/images/generations")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .context("image generation request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("image API error {}: {}", status, body));
        }

        let body: Value = resp.json().await?;
        let b64 = body["data"][0]["b64_json"]
            .as_str()
            .ok_or_else(|| anyhow!("no image data in response"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .context("image payload is not valid base64")?;

        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await.context("failed to write image file")?;
        info!("generated image at {}", path);
        Ok(())
    }
}
