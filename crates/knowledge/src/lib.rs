//! Knowledge base for PostApply.
//!
//! Turns a directory of text documents into a searchable vector index and
//! answers questions grounded in it:
//! - [`document`]: corpus loading
//! - [`chunker`]: overlapping, traceable chunks
//! - [`embeddings`]: the embedder capability and its providers
//! - [`index`]: exact cosine search with an atomic on-disk snapshot
//! - [`rag`]: retrieval-augmented answering and the query log
//! - [`evaluation`]: retrieval precision/recall over labelled queries

pub mod chunker;
pub mod document;
pub mod embeddings;
pub mod evaluation;
pub mod index;
pub mod rag;

// Re-export commonly used types
pub use chunker::{chunk_corpus, chunk_document, Chunk, ChunkConfig};
pub use document::{category_for, load_documents, Document};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use evaluation::{evaluate, load_cases, CaseResult, EvalCase, EvalReport};
pub use index::{IndexStats, SearchHit, VectorIndex};
pub use rag::{
    ChainPrompt, QueryLog, QueryLogEntry, RagEngine, RagOptions, SourceRef, StructuredContext,
    SynthesisResponse,
};
