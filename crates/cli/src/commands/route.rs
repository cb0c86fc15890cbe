//! Route command handler.
//!
//! Sends one typed request through the query router and prints the envelope.

use super::{export_log, open_engine, print_json};
use clap::Args;
use postapply_advisor::Router;
use postapply_core::{config::AppConfig, AppError, AppResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Send a typed request through the query router
#[derive(Args, Debug)]
pub struct RouteCommand {
    /// Query type (timing_advice, message_review, full_strategy, career_question,
    /// explain_recommendation)
    pub query_type: String,

    /// Request payload as a JSON object
    #[arg(default_value = "{}")]
    pub payload: String,

    /// Append the query log to this JSON Lines file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl RouteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let payload: serde_json::Value = serde_json::from_str(&self.payload)
            .map_err(|e| AppError::Config(format!("Payload is not valid JSON: {}", e)))?;

        let router = Router::new(Arc::new(open_engine(config)?));
        let response = router.process(&self.query_type, payload).await;

        export_log(router.rag(), self.log_file.as_deref())?;

        if !response.is_success() {
            tracing::warn!("Query {:?} did not succeed", self.query_type);
        }
        print_json(&response)
    }
}
