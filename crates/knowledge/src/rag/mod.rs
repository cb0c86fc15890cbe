//! RAG (Retrieval-Augmented Generation) answering system.
//!
//! Provides grounded answers over the indexed corpus using LLM synthesis.

pub mod engine;
pub mod log;
pub mod types;

pub use engine::{grounding_context, RagEngine};
pub use log::{QueryLog, QueryLogEntry};
pub use types::{
    ChainPrompt, ContextEntry, RagOptions, SourceRef, StructuredContext, SynthesisResponse,
};
