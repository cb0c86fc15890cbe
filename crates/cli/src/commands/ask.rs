//! Ask command handler.
//!
//! Answers a free-form question from the indexed corpus, optionally
//! reconciled with known recommendation metrics.

use super::{export_log, open_engine, print_json};
use clap::Args;
use postapply_core::{config::AppConfig, AppError, AppResult};
use postapply_knowledge::StructuredContext;
use std::path::PathBuf;

/// Ask a free-form question against the corpus
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of chunks to retrieve (default: from configuration)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Metric to reconcile the answer with, as LABEL=VALUE (repeatable)
    #[arg(long = "metric", value_name = "LABEL=VALUE")]
    pub metrics: Vec<String>,

    /// Append the query log to this JSON Lines file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::debug!("Ask command options: {:?}", self);

        let context = parse_metrics(&self.metrics)?;
        let engine = open_engine(config)?;
        let k = self.top_k.unwrap_or(engine.options().default_k);

        let result = engine
            .query(&self.question, k, (!context.is_empty()).then_some(&context))
            .await;
        export_log(&engine, self.log_file.as_deref())?;
        let response = result?;

        if self.json {
            print_json(&response)?;
        } else {
            println!("{}", response.answer);
            println!();

            if response.sources.is_empty() {
                println!("Sources: (no sources available)");
            } else {
                println!("Sources:");
                for source in &response.sources {
                    println!("- {} [{}]: {}", source.filename, source.category, source.preview);
                }
            }
        }

        Ok(())
    }
}

/// Parse `LABEL=VALUE` pairs, keeping their order.
fn parse_metrics(raw: &[String]) -> AppResult<StructuredContext> {
    raw.iter().try_fold(StructuredContext::new(), |context, pair| {
        match pair.split_once('=') {
            Some((label, value)) if !label.trim().is_empty() => {
                Ok(context.with(label.trim(), value.trim()))
            }
            _ => Err(AppError::Config(format!(
                "Invalid metric {:?}, expected LABEL=VALUE",
                pair
            ))),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metrics_keeps_order() {
        let context = parse_metrics(&[
            "Recommended wait=3-5 days".to_string(),
            "Confidence = 82.4".to_string(),
        ])
        .unwrap();

        assert_eq!(
            context.render(),
            "- Recommended wait: 3-5 days\n- Confidence: 82.4"
        );
    }

    #[test]
    fn test_parse_metrics_rejects_missing_separator() {
        assert!(parse_metrics(&["confidence".to_string()]).is_err());
        assert!(parse_metrics(&["=5".to_string()]).is_err());
        assert!(parse_metrics(&[]).unwrap().is_empty());
    }
}
