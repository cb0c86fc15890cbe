//! Embedder capability for the knowledge base.
//!
//! Provides provider-agnostic embedding generation. The vector index and the
//! retrieval engine only ever see `Arc<dyn EmbeddingProvider>`.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
