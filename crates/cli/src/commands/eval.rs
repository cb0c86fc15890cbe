//! Eval command handler.
//!
//! Scores retrieval against labelled cases; no generation is involved.

use super::print_json;
use clap::Args;
use postapply_core::{config::AppConfig, AppResult};
use postapply_knowledge::{create_provider, evaluate, load_cases, EmbeddingConfig, VectorIndex};
use std::path::PathBuf;

/// Measure retrieval quality against labelled cases
#[derive(Args, Debug)]
pub struct EvalCommand {
    /// JSON file with an array of {query, expected_categories} cases
    pub cases: PathBuf,

    /// Number of chunks to retrieve per case
    #[arg(short = 'k', long, default_value = "3")]
    pub top_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl EvalCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let cases = load_cases(&self.cases)?;
        let index = VectorIndex::load(&config.snapshot_path())?;
        let embedder = create_provider(&EmbeddingConfig::from(&config.embedding))?;
        index.check_embedder(embedder.as_ref())?;

        let report = evaluate(&index, embedder.as_ref(), &cases, self.top_k).await?;

        if self.json {
            return print_json(&report);
        }

        for case in &report.cases {
            println!(
                "P={:.2} R={:.2}  {}  (expected: {}, retrieved: {})",
                case.precision,
                case.recall,
                case.query,
                case.expected_categories.join(", "),
                case.retrieved_categories.join(", ")
            );
        }
        println!();
        println!(
            "{} cases at k={}: precision {:.2}, recall {:.2}, F1 {:.2}",
            report.cases.len(),
            report.k,
            report.avg_precision,
            report.avg_recall,
            report.f1
        );

        Ok(())
    }
}
