//! Index command handler.
//!
//! Builds the vector index from the corpus directory and reports on it.

use super::print_json;
use clap::{Args, Subcommand};
use postapply_core::{config::AppConfig, AppError, AppResult};
use postapply_knowledge::{
    chunk_corpus, create_provider, load_documents, ChunkConfig, EmbeddingConfig, VectorIndex,
};
use std::path::PathBuf;
use std::time::Instant;

/// Build or inspect the vector index
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Load, chunk and embed the corpus, then write the snapshot
    Build(IndexBuildCommand),
    /// Show snapshot statistics
    Stats(IndexStatsCommand),
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Build(cmd) => cmd.execute(config).await,
            IndexAction::Stats(cmd) => cmd.execute(config),
        }
    }
}

#[derive(Args, Debug)]
pub struct IndexBuildCommand {
    /// Corpus directory (default: from configuration)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let corpus = self.corpus.clone().unwrap_or_else(|| config.corpus_dir());
        let snapshot = config.snapshot_path();
        tracing::info!("Building index from {:?} into {:?}", corpus, snapshot);

        let started = Instant::now();

        let documents = load_documents(&corpus, &config.knowledge.extensions)?;
        if documents.is_empty() {
            return Err(AppError::Knowledge(format!(
                "No documents found in {:?} (extensions: {})",
                corpus,
                config.knowledge.extensions.join(", ")
            )));
        }

        let chunk_config = ChunkConfig::new(config.knowledge.chunk_size, config.knowledge.chunk_overlap);
        let chunks = chunk_corpus(&documents, &chunk_config)?;
        tracing::info!("Chunked {} documents into {} chunks", documents.len(), chunks.len());

        let embedding_config = EmbeddingConfig::from(&config.embedding);
        let embedder = create_provider(&embedding_config)?;

        let index = VectorIndex::build_and_save(
            &documents,
            chunks,
            embedder.as_ref(),
            embedding_config.batch_size,
            &snapshot,
        )
        .await?;

        let stats = index.stats();
        let elapsed = started.elapsed().as_secs_f64();

        if self.json {
            print_json(&serde_json::json!({
                "snapshot": snapshot,
                "documents": stats.documents,
                "chunks": stats.chunks,
                "dimension": stats.dimension,
                "provider": stats.provider,
                "model": stats.model,
                "durationSecs": elapsed,
            }))?;
        } else {
            println!(
                "Indexed {} documents ({} chunks, dimension {}) in {:.2}s",
                stats.documents, stats.chunks, stats.dimension, elapsed
            );
            println!("Snapshot: {}", snapshot.display());
        }

        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let snapshot = config.snapshot_path();
        let index = VectorIndex::load(&snapshot)?;
        let stats = index.stats();

        if self.json {
            print_json(&stats)?;
        } else {
            println!("Snapshot:   {}", snapshot.display());
            println!("Documents:  {}", stats.documents);
            println!("Chunks:     {}", stats.chunks);
            println!("Dimension:  {}", stats.dimension);
            println!("Embeddings: {} ({})", stats.provider, stats.model);
        }

        Ok(())
    }
}
