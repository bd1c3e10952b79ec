//! # Service Layer
//!
//! High-level entry points tying the codec, security and transport together.
//!
//! ## Components
//! - **Orchestrator**: validate → encode → seal, and the inverse
//! - **StreamSession**: chunked delivery and reassembly over one channel

pub mod orchestrator;
pub mod stream;

pub use orchestrator::{EncodeOptions, Orchestrator, OrchestratorBuilder};
pub use stream::StreamSession;
