//! `pulse-llm`: text-generation collaborator.
//!
//! Everything that needs generated prose goes through [`TextGenerator`]:
//! one prompt in, one block of text out. [`HttpGenerator`] speaks the
//! OpenAI-compatible `chat/completions` protocol; [`ScriptedGenerator`]
//! replays canned replies in tests.

pub mod client;
pub mod error;
pub mod scripted;
pub mod types;

use async_trait::async_trait;

pub use client::HttpGenerator;
pub use error::GenerationError;
pub use scripted::ScriptedGenerator;
pub use types::GenerationRequest;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, GenerationError>;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, req: GenerationRequest) -> Result<String>;
}
