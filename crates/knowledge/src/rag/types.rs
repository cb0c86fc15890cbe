//! RAG request and response types.

use postapply_core::AppConfig;
use postapply_prompt::BuiltPrompt;
use serde::{Deserialize, Serialize};

/// A single source reference used to answer a query.
///
/// This is the user-facing representation of where information came from.
/// Internal details like chunk ids and scores are hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Corpus file the chunk came from (e.g., "01_timing.txt")
    pub filename: String,

    /// Category code of that file
    pub category: String,

    /// Leading characters of the chunk text, for a human check of the evidence
    pub preview: String,
}

/// Answer synthesized from retrieved chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResponse {
    /// Generated answer text
    pub answer: String,

    /// Sources in retrieval order
    pub sources: Vec<SourceRef>,
}

/// One labelled metric in a [`StructuredContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub label: String,
    pub value: String,
}

/// Ordered metrics from an external recommender that the answer must be
/// reconciled with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredContext {
    entries: Vec<ContextEntry>,
}

impl StructuredContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a metric, keeping insertion order.
    pub fn with(mut self, label: impl Into<String>, value: impl ToString) -> Self {
        self.entries.push(ContextEntry {
            label: label.into(),
            value: value.to_string(),
        });
        self
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a bullet block, one `- label: value` line per entry.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("- {}: {}", e.label, e.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A fully rendered chain prompt, ready for the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainPrompt {
    pub system: Option<String>,
    pub user: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl From<BuiltPrompt> for ChainPrompt {
    fn from(built: BuiltPrompt) -> Self {
        Self {
            system: built.system,
            user: built.user,
            max_tokens: built.max_tokens,
            temperature: built.temperature,
        }
    }
}

/// Generation and retrieval defaults for a [`RagEngine`](super::RagEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct RagOptions {
    /// Model name passed to the generator
    pub model: String,

    /// Default completion budget
    pub max_tokens: u32,

    /// Default sampling temperature
    pub temperature: f32,

    /// Chunks retrieved when the caller does not choose
    pub default_k: usize,

    /// Characters of chunk text shown in a source preview
    pub preview_chars: usize,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            default_k: 3,
            preview_chars: 150,
        }
    }
}

impl RagOptions {
    /// Options taken from the application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            default_k: config.knowledge.top_k,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_context_render_keeps_order() {
        let context = StructuredContext::new()
            .with("Timing", "Wait 1-3 days")
            .with("Confidence", 95)
            .with("Q-value", "10.83");

        assert_eq!(
            context.render(),
            "- Timing: Wait 1-3 days\n- Confidence: 95\n- Q-value: 10.83"
        );
        assert_eq!(context.entries().len(), 3);
    }

    #[test]
    fn test_structured_context_serializes_as_list() {
        let context = StructuredContext::new().with("Style", "casual");
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"label": "Style", "value": "casual"}])
        );
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AppConfig::default();
        config.llm.model = "qwen2.5".to_string();
        config.knowledge.top_k = 5;

        let options = RagOptions::from_config(&config);
        assert_eq!(options.model, "qwen2.5");
        assert_eq!(options.default_k, 5);
        assert_eq!(options.preview_chars, 150);
    }
}
