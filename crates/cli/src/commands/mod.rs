//! Command handlers for the PostApply CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod eval;
pub mod index;
pub mod route;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use eval::EvalCommand;
pub use index::IndexCommand;
pub use route::RouteCommand;

use postapply_core::{config::AppConfig, AppResult};
use postapply_knowledge::{create_provider, EmbeddingConfig, RagEngine, RagOptions, VectorIndex};
use postapply_llm::create_client;
use postapply_prompt::PromptCatalog;
use std::path::Path;
use std::sync::Arc;

/// Load the index snapshot and wire the engine from configuration.
///
/// Fails with `IndexMissing` until `postapply index build` has run.
pub(crate) fn open_engine(config: &AppConfig) -> AppResult<RagEngine> {
    let snapshot = config.snapshot_path();
    tracing::debug!("Loading index snapshot from {:?}", snapshot);

    let index = VectorIndex::load(&snapshot)?;
    let embedder = create_provider(&EmbeddingConfig::from(&config.embedding))?;
    let generator = create_client(&config.llm)?;
    let prompts = PromptCatalog::load(&config.workspace)?;

    RagEngine::new(
        Arc::new(index),
        embedder,
        generator,
        prompts,
        RagOptions::from_config(config),
    )
}

/// Append the engine's query log to `path`, if one was requested.
pub(crate) fn export_log(engine: &RagEngine, path: Option<&Path>) -> AppResult<()> {
    if let Some(path) = path {
        let written = engine.log().export_jsonl(path)?;
        tracing::info!("Exported {} query log entries to {:?}", written, path);
    }
    Ok(())
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
