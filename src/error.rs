// src/error.rs

use thiserror::Error;

/// Failure of a single turn. The turn aborts without committing any state;
/// the caller can retry the same message safely.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl TurnError {
    pub fn stage(&self) -> &'static str {
        match self {
            TurnError::Stage { stage, .. } => stage,
        }
    }
}
