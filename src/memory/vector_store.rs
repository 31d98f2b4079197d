// src/memory/vector_store.rs
// Qdrant-backed vector store, talked to over its HTTP API.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::llm::EmbeddingModel;
use crate::memory::types::{MemoryHit, MemoryRecord};

/// Storage seam for embedded memory records. Embeddings are produced inside
/// the store; callers only ever see text and scores.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed `record.text` and upsert by `record.id`.
    async fn store(&self, record: &MemoryRecord) -> Result<()>;

    /// Top-1 nearest neighbor for `text` within one user's records. Used by
    /// the dedup path; no threshold is applied here.
    async fn find_similar(&self, user_id: &str, text: &str) -> Result<Option<MemoryHit>>;

    /// Top-k nearest neighbors by cosine similarity, descending score, ties
    /// broken by id.
    async fn search(&self, user_id: &str, query: &str, k: usize) -> Result<Vec<MemoryHit>>;
}

pub struct QdrantVectorStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    embedder: Arc<dyn EmbeddingModel>,
    collection_ready: OnceCell<()>,
}

impl QdrantVectorStore {
    pub fn new(
        client: Client,
        base_url: String,
        api_key: Option<String>,
        collection: String,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            collection,
            embedder,
            collection_ready: OnceCell::new(),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Create the collection if missing. Safe to call repeatedly; only the
    /// first write pays for it.
    async fn ensure_collection(&self) -> Result<()> {
        self.collection_ready
            .get_or_try_init(|| async {
                let url = format!("{}/collections/{}", self.base_url, self.collection);
                let resp = self.request(self.client.get(&url)).send().await?;
                if resp.status().is_success() {
                    return Ok(());
                }

                let body = json!({
                    "vectors": {
                        "size": self.embedder.dimensions(),
                        "distance": "Cosine"
                    }
                });
                let resp = self
                    .request(self.client.put(&url))
                    .json(&body)
                    .send()
                    .await?;

                let status = resp.status();
                let err_body = resp.text().await.unwrap_or_default();
                if status.is_success() || status.as_u16() == 409 || err_body.contains("already exists")
                {
                    info!("Qdrant collection '{}' ready", self.collection);
                    Ok(())
                } else {
                    Err(anyhow!("failed to create Qdrant collection: {}", err_body))
                }
            })
            .await
            .map(|_| ())
    }

    fn hit_from_point(point: &Value) -> Option<MemoryHit> {
        let payload = point.get("payload")?;
        let record = MemoryRecord {
            id: point.get("id")?.as_str()?.to_string(),
            user_id: payload.get("user_id")?.as_str()?.to_string(),
            text: payload.get("text")?.as_str()?.to_string(),
            timestamp: payload
                .get("timestamp")
                .and_then(|v| v.as_str())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now),
        };
        let score = point.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
        Some(MemoryHit { record, score })
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn store(&self, record: &MemoryRecord) -> Result<()> {
        self.ensure_collection().await?;

        let embedding = self.embedder.embed(&record.text).await?;

        let point = json!({
            "id": record.id,
            "vector": embedding,
            "payload": {
                "user_id": record.user_id,
                "text": record.text,
                "timestamp": record.timestamp.to_rfc3339(),
            },
        });

        let url = format!("{}/collections/{}/points", self.base_url, self.collection);
        let resp = self
            .request(self.client.put(&url))
            .json(&json!({ "points": [point] }))
            .send()
            .await
            .context("Qdrant upsert request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!(
                "Qdrant upsert failed: {}",
                resp.text().await.unwrap_or_default()
            ));
        }
        debug!("stored memory '{}' for user {}", record.text, record.user_id);
        Ok(())
    }

    async fn find_similar(&self, user_id: &str, text: &str) -> Result<Option<MemoryHit>> {
        let mut hits = self.search(user_id, text, 1).await?;
        Ok(hits.pop())
    }

    async fn search(&self, user_id: &str, query: &str, k: usize) -> Result<Vec<MemoryHit>> {
        // Nothing stored yet means nothing to find, not an error.
        if self.ensure_collection().await.is_err() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        // Records are namespaced per user; similarity alone must never cross
        // user boundaries.
        let body = json!({
            "vector": embedding,
            "limit": k,
            "with_payload": true,
            "filter": {
                "must": [{ "key": "user_id", "match": { "value": user_id } }]
            }
        });

        let resp = self
            .request(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .context("Qdrant search request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!(
                "Qdrant search failed: {}",
                resp.text().await.unwrap_or_default()
            ));
        }

        let body: Value = resp.json().await?;
        let mut hits: Vec<MemoryHit> = body
            .get("result")
            .and_then(|r| r.as_array())
            .map(|points| points.iter().filter_map(Self::hit_from_point).collect())
            .unwrap_or_default();

        // Qdrant already returns descending scores; the id tie-break keeps
        // ordering deterministic for equal scores.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}
