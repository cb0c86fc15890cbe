//! Query router.
//!
//! Parses a `(query_type, payload)` pair into a [`QueryRequest`], runs the
//! chain (or chain pair) for it and wraps the outcome in a [`UnifiedResponse`].
//! `process` never fails: provider errors, malformed payloads and unknown query
//! types all come back as envelope data.

use crate::chains::{
    run_chain, CareerAnswer, CareerQa, ConfidenceExplainer, ExplainInput, Explanation,
    MessageCoach, MessageInput, MessageReview, QuestionInput, Strategy, StrategyInput,
    StrategySynthesizer, StyleMetrics, TimingAdvice, TimingAdvisor, TimingInput, TimingMetrics,
};
use postapply_core::AppResult;
use postapply_knowledge::RagEngine;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

/// The five supported request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    TimingAdvice,
    MessageReview,
    FullStrategy,
    CareerQuestion,
    ExplainRecommendation,
}

impl QueryType {
    pub const ALL: [QueryType; 5] = [
        QueryType::TimingAdvice,
        QueryType::MessageReview,
        QueryType::FullStrategy,
        QueryType::CareerQuestion,
        QueryType::ExplainRecommendation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::TimingAdvice => "timing_advice",
            QueryType::MessageReview => "message_review",
            QueryType::FullStrategy => "full_strategy",
            QueryType::CareerQuestion => "career_question",
            QueryType::ExplainRecommendation => "explain_recommendation",
        }
    }

    /// Exact, case-sensitive match on the wire name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Label reported as `chain_used`.
    pub fn chain_used(&self) -> &'static str {
        match self {
            QueryType::TimingAdvice => "Timing Advisor + Confidence Explainer",
            QueryType::MessageReview => "Message Coach + Confidence Explainer",
            QueryType::FullStrategy => "Strategy Synthesizer",
            QueryType::CareerQuestion => "Career Q&A",
            QueryType::ExplainRecommendation => "Confidence Explainer",
        }
    }

    pub fn supported() -> Vec<&'static str> {
        Self::ALL.iter().map(QueryType::as_str).collect()
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a raw request could not be turned into a [`QueryRequest`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Unsupported query type: {0}")]
    Unsupported(String),

    #[error("Invalid {query_type} payload: {message}")]
    InvalidPayload {
        query_type: QueryType,
        message: String,
    },
}

/// A parsed request, one variant per query type.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryRequest {
    TimingAdvice(TimingInput),
    MessageReview(MessageInput),
    FullStrategy(StrategyInput),
    CareerQuestion(QuestionInput),
    ExplainRecommendation(ExplainInput),
}

impl QueryRequest {
    /// Parse a request. A `null` payload means "all defaults".
    pub fn parse(query_type: &str, payload: Value) -> Result<Self, RequestError> {
        let kind = QueryType::parse(query_type)
            .ok_or_else(|| RequestError::Unsupported(query_type.to_string()))?;
        let payload = match payload {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let invalid = |e: serde_json::Error| RequestError::InvalidPayload {
            query_type: kind,
            message: e.to_string(),
        };

        Ok(match kind {
            QueryType::TimingAdvice => {
                QueryRequest::TimingAdvice(serde_json::from_value(payload).map_err(invalid)?)
            }
            QueryType::MessageReview => {
                QueryRequest::MessageReview(serde_json::from_value(payload).map_err(invalid)?)
            }
            QueryType::FullStrategy => {
                QueryRequest::FullStrategy(serde_json::from_value(payload).map_err(invalid)?)
            }
            QueryType::CareerQuestion => {
                QueryRequest::CareerQuestion(serde_json::from_value(payload).map_err(invalid)?)
            }
            QueryType::ExplainRecommendation => {
                QueryRequest::ExplainRecommendation(parse_explain(payload).map_err(|message| {
                    RequestError::InvalidPayload {
                        query_type: kind,
                        message,
                    }
                })?)
            }
        })
    }

    pub fn query_type(&self) -> QueryType {
        match self {
            QueryRequest::TimingAdvice(_) => QueryType::TimingAdvice,
            QueryRequest::MessageReview(_) => QueryType::MessageReview,
            QueryRequest::FullStrategy(_) => QueryType::FullStrategy,
            QueryRequest::CareerQuestion(_) => QueryType::CareerQuestion,
            QueryRequest::ExplainRecommendation(_) => QueryType::ExplainRecommendation,
        }
    }
}

/// `{ "type": "timing" | "style", "metrics": { ... } }`, timing by default.
/// `recommendation_type` is accepted in place of `type`.
fn parse_explain(payload: Value) -> Result<ExplainInput, String> {
    let Value::Object(mut fields) = payload else {
        return Err("expected a JSON object".to_string());
    };
    let metrics = match fields.remove("metrics") {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(metrics) => metrics,
    };
    let short = kind_field(&mut fields, "type")?;
    let long = kind_field(&mut fields, "recommendation_type")?;
    if let Some(key) = fields.keys().next() {
        return Err(format!("unknown field `{}`", key));
    }
    let recommendation_type = match (short, long) {
        (Some(a), Some(b)) if a != b => {
            return Err(format!(
                "type {:?} conflicts with recommendation_type {:?}",
                a, b
            ))
        }
        (Some(kind), _) | (None, Some(kind)) => kind,
        (None, None) => "timing".to_string(),
    };

    match recommendation_type.as_str() {
        "timing" => serde_json::from_value::<TimingMetrics>(metrics)
            .map(ExplainInput::Timing)
            .map_err(|e| e.to_string()),
        "style" => serde_json::from_value::<StyleMetrics>(metrics)
            .map(ExplainInput::Style)
            .map_err(|e| e.to_string()),
        other => Err(format!(
            "unknown recommendation type {:?} (expected \"timing\" or \"style\")",
            other
        )),
    }
}

fn kind_field(
    fields: &mut serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<String>, String> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(format!("{} must be a string, got {}", key, other)),
    }
}

/// Chain output for one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RouteOutput {
    Timing {
        #[serde(flatten)]
        advice: TimingAdvice,
        plain_explanation: String,
    },
    Message {
        #[serde(flatten)]
        review: MessageReview,
        style_explanation: String,
    },
    Strategy(Strategy),
    Career(CareerAnswer),
    Explanation(Explanation),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

/// Router output envelope, serialized flat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UnifiedResponse {
    Success {
        query_type: QueryType,
        chain_used: &'static str,
        #[serde(flatten)]
        output: RouteOutput,
    },
    Failure {
        query_type: QueryType,
        chain_used: &'static str,
        error: ErrorInfo,
    },
    Unsupported {
        query_type: String,
        error: String,
        supported_types: Vec<&'static str>,
    },
}

impl UnifiedResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, UnifiedResponse::Success { .. })
    }

    /// `chain_used`, absent for unsupported query types
    pub fn chain_used(&self) -> Option<&'static str> {
        match self {
            UnifiedResponse::Success { chain_used, .. }
            | UnifiedResponse::Failure { chain_used, .. } => Some(chain_used),
            UnifiedResponse::Unsupported { .. } => None,
        }
    }

    fn failure(query_type: QueryType, kind: &str, message: String) -> Self {
        UnifiedResponse::Failure {
            query_type,
            chain_used: query_type.chain_used(),
            error: ErrorInfo {
                kind: kind.to_string(),
                message,
            },
        }
    }
}

/// Dispatches requests to chains over one shared engine.
#[derive(Debug, Clone)]
pub struct Router {
    rag: Arc<RagEngine>,
}

impl Router {
    pub fn new(rag: Arc<RagEngine>) -> Self {
        Self { rag }
    }

    pub fn rag(&self) -> &RagEngine {
        &self.rag
    }

    /// Parse and run one raw request.
    pub async fn process(&self, query_type: &str, payload: Value) -> UnifiedResponse {
        match QueryRequest::parse(query_type, payload) {
            Ok(request) => self.dispatch(request).await,
            Err(RequestError::Unsupported(name)) => {
                tracing::warn!("Unsupported query type: {}", name);
                UnifiedResponse::Unsupported {
                    error: format!("Unsupported query type: {}", name),
                    query_type: name,
                    supported_types: QueryType::supported(),
                }
            }
            Err(RequestError::InvalidPayload {
                query_type,
                message,
            }) => {
                tracing::warn!("Invalid {} payload: {}", query_type, message);
                UnifiedResponse::failure(query_type, "invalid_payload", message)
            }
        }
    }

    /// Run an already parsed request.
    pub async fn dispatch(&self, request: QueryRequest) -> UnifiedResponse {
        let query_type = request.query_type();
        let span = tracing::info_span!("route", query_type = %query_type);

        match self.run(request).instrument(span).await {
            Ok(output) => UnifiedResponse::Success {
                query_type,
                chain_used: query_type.chain_used(),
                output,
            },
            Err(e) => {
                tracing::error!("Route {} failed: {}", query_type, e);
                UnifiedResponse::failure(query_type, e.kind(), e.to_string())
            }
        }
    }

    async fn run(&self, request: QueryRequest) -> AppResult<RouteOutput> {
        let rag = self.rag.as_ref();

        match request {
            QueryRequest::TimingAdvice(input) => {
                let advice = run_chain(&TimingAdvisor, rag, input).await?;
                let metrics = TimingMetrics {
                    wait_time: Some(advice.recommendation.clone()),
                    q_value: Some(advice.q_value),
                    confidence: Some(advice.confidence),
                    company_type: Some(advice.company_type.to_string()),
                };
                let explanation =
                    run_chain(&ConfidenceExplainer, rag, ExplainInput::Timing(metrics)).await?;
                Ok(RouteOutput::Timing {
                    advice,
                    plain_explanation: explanation.explanation,
                })
            }
            QueryRequest::MessageReview(input) => {
                let review = run_chain(&MessageCoach, rag, input).await?;
                let style = &review.recommended_style;
                let metrics = StyleMetrics {
                    style: Some(style.style.to_string()),
                    success_rate: Some(style.success_rate),
                    confidence: Some(style.confidence),
                    company_type: Some(review.company_type.to_string()),
                };
                let explanation =
                    run_chain(&ConfidenceExplainer, rag, ExplainInput::Style(metrics)).await?;
                Ok(RouteOutput::Message {
                    review,
                    style_explanation: explanation.explanation,
                })
            }
            QueryRequest::FullStrategy(input) => run_chain(&StrategySynthesizer, rag, input)
                .await
                .map(RouteOutput::Strategy),
            QueryRequest::CareerQuestion(input) => run_chain(&CareerQa, rag, input)
                .await
                .map(RouteOutput::Career),
            QueryRequest::ExplainRecommendation(input) => {
                run_chain(&ConfidenceExplainer, rag, input)
                    .await
                    .map(RouteOutput::Explanation)
            }
        }
    }
}
