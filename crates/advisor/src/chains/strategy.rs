//! Strategy synthesizer: a full follow-up plan for one application.
//!
//! Combines the timing and style lookups with three retrievals (timing,
//! messaging in the recommended style, company research).

use super::{guidance, render, Chain, Retrieval};
use crate::tables::{
    recommend_style, recommend_timing, CompanyType, StyleRecommendation, TimingRecommendation,
};
use postapply_core::AppResult;
use postapply_knowledge::{ChainPrompt, SynthesisResponse};
use postapply_prompt::PromptCatalog;
use serde::{Deserialize, Serialize};

const RETRIEVAL_K: usize = 2;
const GUIDANCE_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyInput {
    pub company_name: String,
    pub company_type: CompanyType,
    pub position: String,
    pub has_connection: bool,
    pub connection_name: String,
    pub days_since_application: u32,
    pub current_situation: String,
}

impl Default for StrategyInput {
    fn default() -> Self {
        Self {
            company_name: "the company".to_string(),
            company_type: CompanyType::default(),
            position: "the position".to_string(),
            has_connection: false,
            connection_name: String::new(),
            days_since_application: 0,
            current_situation: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyPlan {
    input: StrategyInput,
    timing: TimingRecommendation,
    style: StyleRecommendation,
}

/// Source file names consulted for each part of the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourcesConsulted {
    pub timing: Vec<String>,
    pub messaging: Vec<String>,
    pub research: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    pub company_name: String,
    pub position: String,
    pub timing: TimingRecommendation,
    pub style: StyleRecommendation,
    pub comprehensive_strategy: String,
    pub should_act_now: bool,
    pub sources_consulted: SourcesConsulted,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StrategySynthesizer;

impl Chain for StrategySynthesizer {
    type Input = StrategyInput;
    type Plan = StrategyPlan;
    type Output = Strategy;

    const NAME: &'static str = "Strategy Synthesizer";

    fn plan(&self, input: StrategyInput) -> StrategyPlan {
        StrategyPlan {
            timing: recommend_timing(input.company_type, input.has_connection),
            style: recommend_style(input.company_type, input.has_connection),
            input,
        }
    }

    fn retrievals(&self, plan: &StrategyPlan) -> Vec<Retrieval> {
        let company = plan.input.company_type;
        vec![
            Retrieval::new(
                format!("When and how should I follow up with a {} company?", company),
                RETRIEVAL_K,
            ),
            Retrieval::new(
                format!(
                    "How should I write a follow-up message for a {} company in {} style?",
                    company, plan.style.style
                ),
                RETRIEVAL_K,
            ),
            Retrieval::new(
                format!(
                    "How should I research a {} company before following up?",
                    company
                ),
                RETRIEVAL_K,
            ),
        ]
    }

    fn prompt(
        &self,
        plan: &StrategyPlan,
        grounding: &[SynthesisResponse],
        prompts: &PromptCatalog,
    ) -> AppResult<Option<ChainPrompt>> {
        let input = &plan.input;
        let connection = if input.has_connection && !input.connection_name.trim().is_empty() {
            input.connection_name.clone()
        } else if input.has_connection {
            "Has a mutual connection".to_string()
        } else {
            "None (cold application)".to_string()
        };
        let situation = if input.current_situation.trim().is_empty() {
            "Not specified".to_string()
        } else {
            input.current_situation.clone()
        };

        render(
            prompts,
            "chain.strategy",
            &[
                ("company_name", input.company_name.clone()),
                ("company_type", input.company_type.to_string()),
                ("position", input.position.clone()),
                ("connection", connection),
                ("days_since", input.days_since_application.to_string()),
                ("situation", situation),
                ("wait_time", plan.timing.wait_time.to_string()),
                ("q_value", format!("{:.2}", plan.timing.q_value)),
                ("timing_confidence", format!("{:.1}", plan.timing.confidence)),
                ("style", plan.style.style.to_string()),
                ("success_rate", format!("{:.1}", plan.style.success_rate * 100.0)),
                ("style_confidence", format!("{:.1}", plan.style.confidence)),
                ("timing_guidance", truncate(guidance(grounding, 0))),
                ("messaging_guidance", truncate(guidance(grounding, 1))),
                ("research_guidance", truncate(guidance(grounding, 2))),
            ],
        )
        .map(Some)
    }

    fn shape(
        &self,
        plan: StrategyPlan,
        grounding: Vec<SynthesisResponse>,
        generated: Option<String>,
    ) -> AppResult<Strategy> {
        let filenames = |index: usize| -> Vec<String> {
            grounding
                .get(index)
                .map(|r| r.sources.iter().map(|s| s.filename.clone()).collect())
                .unwrap_or_default()
        };

        Ok(Strategy {
            should_act_now: plan.timing.should_act_now(plan.input.days_since_application),
            sources_consulted: SourcesConsulted {
                timing: filenames(0),
                messaging: filenames(1),
                research: filenames(2),
            },
            company_name: plan.input.company_name,
            position: plan.input.position,
            timing: plan.timing,
            style: plan.style,
            comprehensive_strategy: generated.unwrap_or_default(),
        })
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(GUIDANCE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{MessageStyle, WaitWindow};
    use postapply_knowledge::SourceRef;

    fn answer(text: &str, files: &[&str]) -> SynthesisResponse {
        SynthesisResponse {
            answer: text.to_string(),
            sources: files
                .iter()
                .map(|f| SourceRef {
                    filename: f.to_string(),
                    category: String::new(),
                    preview: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let input: StrategyInput = serde_json::from_str(r#"{"company_type": "startup"}"#).unwrap();
        assert_eq!(input.company_name, "the company");
        assert_eq!(input.position, "the position");
        assert_eq!(input.company_type, CompanyType::Startup);
        assert_eq!(input.days_since_application, 0);
    }

    #[test]
    fn test_three_retrievals_use_recommended_style() {
        let plan = StrategySynthesizer.plan(StrategyInput {
            company_type: CompanyType::Startup,
            ..Default::default()
        });
        let queries: Vec<String> = StrategySynthesizer
            .retrievals(&plan)
            .into_iter()
            .map(|r| {
                assert_eq!(r.k, 2);
                r.query
            })
            .collect();

        assert_eq!(
            queries,
            vec![
                "When and how should I follow up with a startup company?",
                "How should I write a follow-up message for a startup company in casual style?",
                "How should I research a startup company before following up?",
            ]
        );
    }

    #[test]
    fn test_prompt_truncates_guidance() {
        let prompts = PromptCatalog::builtin().unwrap();
        let plan = StrategySynthesizer.plan(StrategyInput {
            company_name: "TechCorp".to_string(),
            has_connection: true,
            connection_name: "Priya (former manager)".to_string(),
            ..Default::default()
        });
        let long = "t".repeat(800);
        let grounding = vec![
            answer(&long, &[]),
            answer("Keep it warm.", &[]),
            answer("Read their engineering blog.", &[]),
        ];

        let prompt = StrategySynthesizer
            .prompt(&plan, &grounding, &prompts)
            .unwrap()
            .unwrap();

        assert_eq!(prompt.max_tokens, Some(2000));
        assert!(prompt.user.contains(&"t".repeat(500)));
        assert!(!prompt.user.contains(&"t".repeat(501)));
        assert!(prompt.user.contains("Connection: Priya (former manager)"));
        assert!(prompt.user.contains("Current situation: Not specified"));
        assert!(prompt.user.contains("Read their engineering blog."));
    }

    #[test]
    fn test_shape_groups_sources() {
        let plan = StrategySynthesizer.plan(StrategyInput {
            company_type: CompanyType::Enterprise,
            days_since_application: 6,
            ..Default::default()
        });
        let grounding = vec![
            answer("a", &["01_timing.txt", "05_follow.txt"]),
            answer("b", &["02_message.txt"]),
            answer("c", &["03_company.txt"]),
        ];

        let strategy = StrategySynthesizer
            .shape(plan, grounding, Some("## IMMEDIATE ACTION".to_string()))
            .unwrap();

        assert_eq!(strategy.timing.wait_time, WaitWindow::Days5To7);
        assert_eq!(strategy.style.style, MessageStyle::ConnectionFocused);
        assert!(strategy.should_act_now);
        assert_eq!(
            strategy.sources_consulted.timing,
            vec!["01_timing.txt", "05_follow.txt"]
        );
        assert_eq!(strategy.sources_consulted.research, vec!["03_company.txt"]);
    }
}
