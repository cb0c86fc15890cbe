//! Advisory chains.
//!
//! Every chain is a stateless policy over the shared [`RagEngine`]: a
//! deterministic pre-step, the retrieval queries it needs, an optional chain
//! prompt and a result shaper. [`run_chain`] is the only code that performs
//! retrieval or generation, so a chain never touches the index or the
//! generator directly.

pub mod confidence;
pub mod message;
pub mod qa;
pub mod strategy;
pub mod timing;

pub use confidence::{ConfidenceExplainer, Explanation, ExplainInput, StyleMetrics, TimingMetrics};
pub use message::{Coaching, CoachingFeedback, MessageCoach, MessageInput, MessageReview};
pub use qa::{CareerAnswer, CareerQa, QuestionInput};
pub use strategy::{SourcesConsulted, Strategy, StrategyInput, StrategySynthesizer};
pub use timing::{TimingAdvice, TimingAdvisor, TimingInput};

use postapply_core::AppResult;
use postapply_knowledge::{ChainPrompt, RagEngine, StructuredContext, SynthesisResponse};
use postapply_prompt::PromptCatalog;

/// One retrieval step requested by a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub query: String,
    pub k: usize,
    pub context: Option<StructuredContext>,
}

impl Retrieval {
    pub fn new(query: impl Into<String>, k: usize) -> Self {
        Self {
            query: query.into(),
            k,
            context: None,
        }
    }

    pub fn with_context(mut self, context: StructuredContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// A specialized retrieval + generation workflow.
pub trait Chain {
    type Input;
    type Plan;
    type Output;

    /// Display name used in logs and router responses
    const NAME: &'static str;

    /// Deterministic pre-step (table lookups, defaults).
    fn plan(&self, input: Self::Input) -> Self::Plan;

    /// Retrieval queries, answered in order.
    fn retrievals(&self, plan: &Self::Plan) -> Vec<Retrieval>;

    /// Chain prompt layered on the retrieved answers, if the chain generates.
    fn prompt(
        &self,
        plan: &Self::Plan,
        grounding: &[SynthesisResponse],
        prompts: &PromptCatalog,
    ) -> AppResult<Option<ChainPrompt>>;

    /// Assemble the chain result.
    fn shape(
        &self,
        plan: Self::Plan,
        grounding: Vec<SynthesisResponse>,
        generated: Option<String>,
    ) -> AppResult<Self::Output>;
}

/// Run `chain` against `rag`.
///
/// Any retrieval or generation failure aborts the chain and is returned as is.
pub async fn run_chain<C: Chain>(chain: &C, rag: &RagEngine, input: C::Input) -> AppResult<C::Output> {
    tracing::info!("Running chain: {}", C::NAME);

    let plan = chain.plan(input);

    let retrievals = chain.retrievals(&plan);
    let mut grounding = Vec::with_capacity(retrievals.len());
    for retrieval in &retrievals {
        tracing::debug!("{}: retrieving {:?} (k={})", C::NAME, retrieval.query, retrieval.k);
        let response = rag
            .query(&retrieval.query, retrieval.k, retrieval.context.as_ref())
            .await?;
        grounding.push(response);
    }

    let generated = match chain.prompt(&plan, &grounding, rag.prompts())? {
        Some(prompt) => Some(rag.generate(&prompt).await?),
        None => None,
    };

    chain.shape(plan, grounding, generated)
}

/// Render a prompt and convert it for the engine.
fn render(
    prompts: &PromptCatalog,
    id: &str,
    variables: &[(&str, String)],
) -> AppResult<ChainPrompt> {
    let variables = variables
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    Ok(prompts.render(id, variables)?.into())
}

/// Answer text of the `index`-th retrieval, empty if it is absent.
fn guidance(grounding: &[SynthesisResponse], index: usize) -> &str {
    grounding
        .get(index)
        .map(|response| response.answer.as_str())
        .unwrap_or_default()
}
