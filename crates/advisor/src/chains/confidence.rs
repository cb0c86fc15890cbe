//! Confidence explainer: restates recommendation metrics in plain language.
//!
//! No retrieval; one short generation per call.

use super::{render, Chain, Retrieval};
use postapply_core::AppResult;
use postapply_knowledge::{ChainPrompt, SynthesisResponse};
use postapply_prompt::PromptCatalog;
use serde::{Deserialize, Serialize};

const MISSING: &str = "N/A";

/// Metrics behind a timing recommendation. Absent values render as "N/A".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_type: Option<String>,
}

/// Metrics behind a style recommendation. Absent values render as "N/A".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Response rate in `0..=1`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "recommendation_type", content = "metrics", rename_all = "snake_case")]
pub enum ExplainInput {
    Timing(TimingMetrics),
    Style(StyleMetrics),
}

impl ExplainInput {
    pub fn kind(&self) -> &'static str {
        match self {
            ExplainInput::Timing(_) => "timing",
            ExplainInput::Style(_) => "style",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    #[serde(flatten)]
    pub input: ExplainInput,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceExplainer;

impl Chain for ConfidenceExplainer {
    type Input = ExplainInput;
    type Plan = ExplainInput;
    type Output = Explanation;

    const NAME: &'static str = "Confidence Explainer";

    fn plan(&self, input: ExplainInput) -> ExplainInput {
        input
    }

    fn retrievals(&self, _plan: &ExplainInput) -> Vec<Retrieval> {
        Vec::new()
    }

    fn prompt(
        &self,
        plan: &ExplainInput,
        _grounding: &[SynthesisResponse],
        prompts: &PromptCatalog,
    ) -> AppResult<Option<ChainPrompt>> {
        let prompt = match plan {
            ExplainInput::Timing(m) => render(
                prompts,
                "chain.confidence.timing",
                &[
                    ("wait_time", text_or_missing(&m.wait_time)),
                    ("q_value", number_or_missing(m.q_value, |v| format!("{:.2}", v))),
                    ("confidence", number_or_missing(m.confidence, |v| format!("{:.1}", v))),
                    ("company_type", text_or_missing(&m.company_type)),
                ],
            )?,
            ExplainInput::Style(m) => render(
                prompts,
                "chain.confidence.style",
                &[
                    ("style", text_or_missing(&m.style)),
                    (
                        "success_rate",
                        number_or_missing(m.success_rate, |v| format!("{:.1}%", v * 100.0)),
                    ),
                    ("confidence", number_or_missing(m.confidence, |v| format!("{:.1}", v))),
                    ("company_type", text_or_missing(&m.company_type)),
                ],
            )?,
        };
        Ok(Some(prompt))
    }

    fn shape(
        &self,
        plan: ExplainInput,
        _grounding: Vec<SynthesisResponse>,
        generated: Option<String>,
    ) -> AppResult<Explanation> {
        Ok(Explanation {
            input: plan,
            explanation: generated.unwrap_or_default(),
        })
    }
}

fn text_or_missing(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| MISSING.to_string())
}

fn number_or_missing(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| MISSING.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_prompt_formats_metrics() {
        let prompts = PromptCatalog::builtin().unwrap();
        let input = ExplainInput::Timing(TimingMetrics {
            wait_time: Some("5-7 days".to_string()),
            q_value: Some(7.8912),
            confidence: Some(100.0),
            company_type: Some("enterprise".to_string()),
        });

        let prompt = ConfidenceExplainer
            .prompt(&input, &[], &prompts)
            .unwrap()
            .unwrap();

        assert_eq!(prompt.max_tokens, Some(500));
        assert!(prompt.user.contains("Recommended timing: 5-7 days"));
        assert!(prompt.user.contains("Expected value score: 7.89"));
        assert!(prompt.user.contains("Confidence: 100.0%"));
    }

    #[test]
    fn test_missing_metrics_render_placeholder() {
        let prompts = PromptCatalog::builtin().unwrap();
        let input = ExplainInput::Style(StyleMetrics {
            style: Some("casual".to_string()),
            ..Default::default()
        });

        let prompt = ConfidenceExplainer
            .prompt(&input, &[], &prompts)
            .unwrap()
            .unwrap();

        assert!(prompt.user.contains("Recommended style: casual"));
        assert!(prompt.user.contains("Response rate: N/A"));
        assert!(prompt.user.contains("Company type: N/A"));
    }

    #[test]
    fn test_no_retrieval() {
        let input = ExplainInput::Timing(TimingMetrics::default());
        assert!(ConfidenceExplainer.retrievals(&input).is_empty());
    }

    #[test]
    fn test_explanation_serialization() {
        let explanation = Explanation {
            input: ExplainInput::Style(StyleMetrics {
                style: Some("formal".to_string()),
                confidence: Some(41.7),
                ..Default::default()
            }),
            explanation: "Formal works for large firms.".to_string(),
        };

        let json = serde_json::to_value(&explanation).unwrap();
        assert_eq!(json["recommendation_type"], "style");
        assert_eq!(json["metrics"]["style"], "formal");
        assert!(json["metrics"].get("success_rate").is_none());
        assert_eq!(json["explanation"], "Formal works for large firms.");
    }
}
