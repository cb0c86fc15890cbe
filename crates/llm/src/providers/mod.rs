//! Generation provider implementations.

pub mod ollama;
pub mod scripted;

pub use ollama::OllamaClient;
pub use scripted::ScriptedClient;
