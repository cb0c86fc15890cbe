//! Advisory layer for PostApply.
//!
//! Static recommendation tables, the five advisory chains and the query
//! router that composes them over one shared [`postapply_knowledge::RagEngine`].

pub mod chains;
pub mod router;
pub mod tables;

pub use chains::{
    run_chain, CareerAnswer, CareerQa, Chain, Coaching, CoachingFeedback, ConfidenceExplainer,
    ExplainInput, Explanation, MessageCoach, MessageInput, MessageReview, QuestionInput,
    Retrieval, SourcesConsulted, Strategy, StrategyInput, StrategySynthesizer, StyleMetrics,
    TimingAdvice, TimingAdvisor, TimingInput, TimingMetrics,
};
pub use router::{
    ErrorInfo, QueryRequest, QueryType, RequestError, RouteOutput, Router, UnifiedResponse,
};
pub use tables::{
    recommend_style, recommend_timing, CompanyType, MessageStyle, StyleRecommendation,
    TimingRecommendation, WaitWindow,
};
