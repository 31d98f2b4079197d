// src/media/mod.rs
// External response collaborators. The engine only sees these traits; the
// HTTP implementations live in the submodules.

pub mod call;
pub mod image;
pub mod speech;

use anyhow::Result;
use async_trait::async_trait;

pub use call::VapiCallClient;
pub use image::TogetherImageClient;
pub use speech::ElevenLabsSpeechClient;

use crate::graph::state::CallInfo;

/// Text-to-image generation.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Render `prompt` and write the image to `path`.
    async fn generate(&self, prompt: &str, path: &str) -> Result<()>;
}

/// Text-to-speech synthesis.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Outbound telephony.
#[async_trait]
pub trait CallService: Send + Sync {
    /// Start a call to `phone_number`, seeding the voice assistant with
    /// `context` from the chat conversation.
    async fn initiate(&self, phone_number: &str, context: &str) -> Result<CallInfo>;
}
