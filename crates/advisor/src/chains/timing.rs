//! Timing advisor: when to follow up.

use super::{guidance, render, Chain, Retrieval};
use crate::tables::{recommend_timing, CompanyType, TimingRecommendation};
use postapply_core::AppResult;
use postapply_knowledge::{ChainPrompt, SourceRef, SynthesisResponse};
use postapply_prompt::PromptCatalog;
use serde::{Deserialize, Serialize};

const RETRIEVAL_K: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingInput {
    pub company_type: CompanyType,
    pub has_connection: bool,
    /// Days since the application was sent
    pub current_day: u32,
}

#[derive(Debug, Clone)]
pub struct TimingPlan {
    input: TimingInput,
    recommendation: TimingRecommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingAdvice {
    /// Recommended window, e.g. "3-5 days"
    pub recommendation: String,
    pub confidence: f64,
    pub q_value: f64,
    pub reasoning: String,
    pub should_act_now: bool,
    pub company_type: CompanyType,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimingAdvisor;

impl Chain for TimingAdvisor {
    type Input = TimingInput;
    type Plan = TimingPlan;
    type Output = TimingAdvice;

    const NAME: &'static str = "Timing Advisor";

    fn plan(&self, input: TimingInput) -> TimingPlan {
        let recommendation = recommend_timing(input.company_type, input.has_connection);
        TimingPlan {
            input,
            recommendation,
        }
    }

    fn retrievals(&self, plan: &TimingPlan) -> Vec<Retrieval> {
        let connection = if plan.input.has_connection {
            "with a connection"
        } else {
            "cold (no connection)"
        };
        vec![Retrieval::new(
            format!(
                "When should I follow up with a {} company {}?",
                plan.input.company_type, connection
            ),
            RETRIEVAL_K,
        )]
    }

    fn prompt(
        &self,
        plan: &TimingPlan,
        grounding: &[SynthesisResponse],
        prompts: &PromptCatalog,
    ) -> AppResult<Option<ChainPrompt>> {
        let connection = if plan.input.has_connection {
            "with a mutual connection"
        } else {
            "as a cold application (no connection)"
        };
        let rec = &plan.recommendation;

        render(
            prompts,
            "chain.timing",
            &[
                ("company_type", plan.input.company_type.to_string()),
                ("connection", connection.to_string()),
                ("current_day", plan.input.current_day.to_string()),
                ("wait_time", rec.wait_time.to_string()),
                ("confidence", format!("{:.1}", rec.confidence)),
                ("q_value", format!("{:.2}", rec.q_value)),
                ("guidance", guidance(grounding, 0).to_string()),
            ],
        )
        .map(Some)
    }

    fn shape(
        &self,
        plan: TimingPlan,
        grounding: Vec<SynthesisResponse>,
        generated: Option<String>,
    ) -> AppResult<TimingAdvice> {
        let rec = plan.recommendation;
        Ok(TimingAdvice {
            recommendation: rec.wait_time.to_string(),
            confidence: rec.confidence,
            q_value: rec.q_value,
            reasoning: generated.unwrap_or_default(),
            should_act_now: rec.should_act_now(plan.input.current_day),
            company_type: plan.input.company_type,
            sources: grounding.into_iter().flat_map(|r| r.sources).collect(),
        })
    }
}

impl TimingPlan {
    pub fn recommendation(&self) -> &TimingRecommendation {
        &self.recommendation
    }
}
