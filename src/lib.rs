// src/lib.rs

pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod media;
pub mod memory;
pub mod router;
pub mod schedule;
pub mod server;
pub mod session;
pub mod state;
pub mod summarizer;
