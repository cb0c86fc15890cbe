//! Career Q&A: a plain grounded answer, no extra generation step.

use super::{Chain, Retrieval};
use postapply_core::AppResult;
use postapply_knowledge::{ChainPrompt, SourceRef, StructuredContext, SynthesisResponse};
use postapply_prompt::PromptCatalog;
use serde::{Deserialize, Serialize};

const RETRIEVAL_K: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuestionInput {
    pub question: String,
    /// Optional metrics the answer should be reconciled with
    pub context: Option<StructuredContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareerAnswer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CareerQa;

impl Chain for CareerQa {
    type Input = QuestionInput;
    type Plan = QuestionInput;
    type Output = CareerAnswer;

    const NAME: &'static str = "Career Q&A";

    fn plan(&self, input: QuestionInput) -> QuestionInput {
        input
    }

    fn retrievals(&self, plan: &QuestionInput) -> Vec<Retrieval> {
        let retrieval = Retrieval::new(plan.question.clone(), RETRIEVAL_K);
        match &plan.context {
            Some(context) => vec![retrieval.with_context(context.clone())],
            None => vec![retrieval],
        }
    }

    fn prompt(
        &self,
        _plan: &QuestionInput,
        _grounding: &[SynthesisResponse],
        _prompts: &PromptCatalog,
    ) -> AppResult<Option<ChainPrompt>> {
        Ok(None)
    }

    fn shape(
        &self,
        plan: QuestionInput,
        grounding: Vec<SynthesisResponse>,
        _generated: Option<String>,
    ) -> AppResult<CareerAnswer> {
        let response = grounding.into_iter().next().unwrap_or(SynthesisResponse {
            answer: String::new(),
            sources: Vec::new(),
        });

        Ok(CareerAnswer {
            question: plan.question,
            answer: response.answer,
            sources: response.sources,
        })
    }
}
