// src/media/call.rs
// Outbound voice calls through the Vapi API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

use crate::graph::state::CallInfo;
use crate::media::CallService;

pub struct VapiCallClient {
    client: Client,
    api_key: String,
    phone_number_id: String,
    assistant_id: String,
}

impl VapiCallClient {
    pub fn new(
        client: Client,
        api_key: String,
        phone_number_id: String,
        assistant_id: String,
    ) -> Self {
        Self {
            client,
            api_key,
            phone_number_id,
            assistant_id,
        }
    }
}

#[async_trait]
impl CallService for VapiCallClient {
    async fn initiate(&self, phone_number: &str, context: &str) -> Result<CallInfo> {
        let payload = json!({
            "phoneNumberId": self.phone_number_id,
            "assistantId": self.assistant_id,
            "customer": { "number": phone_number },
            "assistantOverrides": {
                "variableValues": { "recentContext": context }
            }
        });

        let resp = self
            .client
            .post("https://api.vapi.ai/call")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .context("call initiation request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("call API error {}: {}", status, body));
        }

        let body: Value = resp.json().await?;
        let call_id = body["id"]
            .as_str()
            .ok_or_else(|| anyhow!("no call id in response"))?
            .to_string();
        let status = body["status"].as_str().unwrap_or("queued").to_string();

        info!("initiated call {} to {}", call_id, phone_number);
        Ok(CallInfo {
            call_id,
            status,
            initiated_at: Utc::now(),
        })
    }
}
