//! Retrieval-augmented answering.
//!
//! Retrieves the top-k chunks for a question, grounds a generation prompt in
//! them and returns the generated answer with its sources.

use super::log::{QueryLog, QueryLogEntry};
use super::types::{ChainPrompt, RagOptions, SourceRef, StructuredContext, SynthesisResponse};
use crate::embeddings::EmbeddingProvider;
use crate::index::{SearchHit, VectorIndex};
use chrono::Utc;
use postapply_core::{AppError, AppResult};
use postapply_llm::{LlmClient, LlmRequest};
use postapply_prompt::PromptCatalog;
use std::collections::HashMap;
use std::sync::Arc;

const GROUNDED_PROMPT: &str = "rag.grounded";
const RECONCILED_PROMPT: &str = "rag.reconciled";

/// RAG engine over a read-only index.
///
/// Safe to share between concurrent queries; the only state written during a
/// query is the append-only [`QueryLog`].
pub struct RagEngine {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn LlmClient>,
    prompts: PromptCatalog,
    options: RagOptions,
    log: QueryLog,
}

impl std::fmt::Debug for RagEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagEngine")
            .field("index", &self.index.stats())
            .field("embedder", &self.embedder)
            .field("generator", &self.generator.provider_name())
            .field("options", &self.options)
            .finish()
    }
}

impl RagEngine {
    /// Create an engine; fails if `embedder` does not match the index dimension.
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn LlmClient>,
        prompts: PromptCatalog,
        options: RagOptions,
    ) -> AppResult<Self> {
        index.check_embedder(embedder.as_ref())?;

        Ok(Self {
            index,
            embedder,
            generator,
            prompts,
            options,
            log: QueryLog::new(),
        })
    }

    /// Retrieve the `k` chunks most similar to `question`.
    pub async fn retrieve(&self, question: &str, k: usize) -> AppResult<Vec<SearchHit>> {
        self.index.search(self.embedder.as_ref(), question, k).await
    }

    /// Answer `question` from the top-`k` retrieved chunks.
    ///
    /// When `context` holds metrics, the prompt asks the generator to
    /// reconcile them with the retrieved text. Generator failures surface as
    /// [`AppError::GenerationProvider`]; no fallback answer is produced.
    pub async fn query(
        &self,
        question: &str,
        k: usize,
        context: Option<&StructuredContext>,
    ) -> AppResult<SynthesisResponse> {
        tracing::info!("RAG query (k={}): {}", k, question);

        let context = context.filter(|c| !c.is_empty());
        let retrieved = self.retrieve(question, k).await;

        self.log.append(QueryLogEntry {
            timestamp: Utc::now(),
            question: question.to_string(),
            structured_context: context.cloned(),
            num_sources: retrieved.as_ref().map_or(0, Vec::len),
        });

        let hits = retrieved?;
        let grounding = grounding_context(&hits);

        let mut variables = HashMap::new();
        variables.insert("context".to_string(), grounding);
        variables.insert("question".to_string(), question.to_string());

        let prompt_id = match context {
            Some(context) => {
                variables.insert("metrics".to_string(), context.render());
                RECONCILED_PROMPT
            }
            None => GROUNDED_PROMPT,
        };

        let prompt = self.prompts.render(prompt_id, variables)?;
        let answer = self.generate(&ChainPrompt::from(prompt)).await?;

        let sources = hits
            .iter()
            .map(|hit| SourceRef {
                filename: hit.filename.clone(),
                category: hit.category.clone(),
                preview: preview(&hit.chunk.text, self.options.preview_chars),
            })
            .collect();

        Ok(SynthesisResponse { answer, sources })
    }

    /// Send a rendered prompt to the generator and return its text.
    pub async fn generate(&self, prompt: &ChainPrompt) -> AppResult<String> {
        let mut request = LlmRequest::new(prompt.user.clone(), self.options.model.clone())
            .with_max_tokens(prompt.max_tokens.unwrap_or(self.options.max_tokens))
            .with_temperature(prompt.temperature.unwrap_or(self.options.temperature));
        if let Some(system) = &prompt.system {
            request = request.with_system(system.clone());
        }

        tracing::debug!(
            "Generating with {} (model: {}, max_tokens: {:?})",
            self.generator.provider_name(),
            request.model,
            request.max_tokens
        );

        let response = self
            .generator
            .complete(&request)
            .await
            .map_err(AppError::into_generation_error)?;

        Ok(response.content)
    }

    pub fn log(&self) -> &QueryLog {
        &self.log
    }

    pub fn prompts(&self) -> &PromptCatalog {
        &self.prompts
    }

    pub fn options(&self) -> &RagOptions {
        &self.options
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

/// Concatenate hit texts in retrieval order, each under its file name.
pub fn grounding_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("[{}]\n{}", hit.filename, hit.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}
