// src/memory/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored fact about one user. `id` is stable across updates: a
/// near-duplicate insert reuses the existing record's id so the store never
/// holds two records above the dedup threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new<S: Into<String>>(user_id: S, text: S) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// A fresh write that updates an existing record in place.
    pub fn update_of<S: Into<String>>(existing_id: String, user_id: S, text: S) -> Self {
        Self {
            id: existing_id,
            user_id: user_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A search result: record plus cosine similarity in [0, 1].
#[derive(Debug, Clone)]
pub struct MemoryHit {
    pub record: MemoryRecord,
    pub score: f32,
}

/// Structured verdict from the importance classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryAnalysis {
    pub is_important: bool,
    pub formatted_memory: Option<String>,
}
