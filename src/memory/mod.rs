// src/memory/mod.rs
// Long-term memory: importance classification, semantic dedup, retrieval.

pub mod manager;
pub mod types;
pub mod vector_store;

pub use manager::MemoryManager;
pub use types::{MemoryAnalysis, MemoryHit, MemoryRecord};
pub use vector_store::{QdrantVectorStore, VectorStore};
