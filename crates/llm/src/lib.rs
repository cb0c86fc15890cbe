//! LLM integration crate for PostApply.
//!
//! This crate provides a provider-agnostic abstraction for text generation.
//! Every consumer holds an `Arc<dyn LlmClient>`, so the retrieval engine and
//! the advisory chains never know which backend answers them.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Scripted**: Deterministic in-process client (`echo` provider, tests)
//!
//! # Example
//! ```no_run
//! use postapply_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("When should I follow up?", "llama3.2")
//!     .with_system("You are a career advisor.");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, ScriptedClient};
pub use types::ProviderType;
