//! Message coach: scores a draft follow-up and proposes a rewrite.
//!
//! The generator is asked for a JSON verdict. Its reply is either parsed into
//! [`Coaching::Structured`] or returned untouched as [`Coaching::RawText`];
//! nothing is invented when parsing fails.

use super::{guidance, render, Chain, Retrieval};
use crate::tables::{recommend_style, CompanyType, StyleRecommendation};
use postapply_core::AppResult;
use postapply_knowledge::{ChainPrompt, SourceRef, SynthesisResponse};
use postapply_prompt::PromptCatalog;
use serde::{Deserialize, Serialize};

const RETRIEVAL_K: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageInput {
    /// Draft follow-up message
    pub message: String,
    pub company_type: CompanyType,
    pub has_connection: bool,
    pub position: String,
}

#[derive(Debug, Clone)]
pub struct MessagePlan {
    input: MessageInput,
    style: StyleRecommendation,
}

/// Parsed coaching verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingFeedback {
    /// 1 (poor) to 10 (perfect)
    pub score: u8,
    pub feedback: Vec<String>,
    pub improved_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_alignment: Option<String>,
}

/// Generator verdict: structured when the reply parsed, raw text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coaching {
    Structured(CoachingFeedback),
    RawText { text: String },
}

impl Coaching {
    /// Interpret a generator reply.
    ///
    /// Accepts a bare JSON object, optionally inside a Markdown code fence.
    /// Scores outside 1-10 are not a valid verdict.
    pub fn from_reply(reply: &str) -> Self {
        let body = strip_code_fence(reply.trim());

        match serde_json::from_str::<CoachingFeedback>(body) {
            Ok(feedback) if (1..=10).contains(&feedback.score) => Coaching::Structured(feedback),
            Ok(feedback) => {
                tracing::warn!("Coaching score {} out of range, keeping raw reply", feedback.score);
                Coaching::RawText {
                    text: reply.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!("Coaching reply is not valid JSON ({}), keeping raw reply", e);
                Coaching::RawText {
                    text: reply.to_string(),
                }
            }
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Coaching::Structured(_))
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageReview {
    pub original_message: String,
    pub coaching: Coaching,
    pub recommended_style: StyleRecommendation,
    pub company_type: CompanyType,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCoach;

impl Chain for MessageCoach {
    type Input = MessageInput;
    type Plan = MessagePlan;
    type Output = MessageReview;

    const NAME: &'static str = "Message Coach";

    fn plan(&self, input: MessageInput) -> MessagePlan {
        let style = recommend_style(input.company_type, input.has_connection);
        MessagePlan { input, style }
    }

    fn retrievals(&self, plan: &MessagePlan) -> Vec<Retrieval> {
        vec![Retrieval::new(
            format!(
                "What makes a good follow-up email for a {} company? How should I structure it?",
                plan.input.company_type
            ),
            RETRIEVAL_K,
        )]
    }

    fn prompt(
        &self,
        plan: &MessagePlan,
        grounding: &[SynthesisResponse],
        prompts: &PromptCatalog,
    ) -> AppResult<Option<ChainPrompt>> {
        let connection = if plan.input.has_connection {
            "with a mutual connection"
        } else {
            "cold (no connection)"
        };
        let position = if plan.input.position.trim().is_empty() {
            "Not specified"
        } else {
            plan.input.position.as_str()
        };

        render(
            prompts,
            "chain.message",
            &[
                ("draft", plan.input.message.clone()),
                ("company_type", plan.input.company_type.to_string()),
                ("connection", connection.to_string()),
                ("position", position.to_string()),
                ("style", plan.style.style.to_string()),
                ("success_rate", format!("{:.1}", plan.style.success_rate * 100.0)),
                ("guidance", guidance(grounding, 0).to_string()),
            ],
        )
        .map(Some)
    }

    fn shape(
        &self,
        plan: MessagePlan,
        grounding: Vec<SynthesisResponse>,
        generated: Option<String>,
    ) -> AppResult<MessageReview> {
        let coaching = Coaching::from_reply(generated.as_deref().unwrap_or_default());

        Ok(MessageReview {
            original_message: plan.input.message,
            coaching,
            recommended_style: plan.style,
            company_type: plan.input.company_type,
            sources: grounding.into_iter().flat_map(|r| r.sources).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::MessageStyle;

    #[test]
    fn test_structured_reply_parsed() {
        let reply = r#"{"score": 4, "feedback": ["Too vague", "Polite"], "improved_message": "Hi Sam, ...", "style_alignment": "Too formal"}"#;

        match Coaching::from_reply(reply) {
            Coaching::Structured(feedback) => {
                assert_eq!(feedback.score, 4);
                assert_eq!(feedback.feedback.len(), 2);
                assert_eq!(feedback.style_alignment.as_deref(), Some("Too formal"));
            }
            other => panic!("expected structured coaching, got {:?}", other),
        }
    }

    #[test]
    fn test_fenced_reply_parsed() {
        let reply = "```json\n{\"score\": 8, \"feedback\": [], \"improved_message\": \"ok\"}\n```";
        assert!(Coaching::from_reply(reply).is_structured());
    }

    #[test]
    fn test_prose_reply_kept_raw() {
        let reply = "Your message is a bit short. Mention the role.";
        assert_eq!(
            Coaching::from_reply(reply),
            Coaching::RawText {
                text: reply.to_string()
            }
        );
    }

    #[test]
    fn test_out_of_range_score_kept_raw() {
        let reply = r#"{"score": 42, "feedback": [], "improved_message": ""}"#;
        assert!(!Coaching::from_reply(reply).is_structured());
    }

    #[test]
    fn test_coaching_serialization_is_tagged() {
        let raw = serde_json::to_value(Coaching::RawText {
            text: "hi".to_string(),
        })
        .unwrap();
        assert_eq!(raw["kind"], "raw_text");
        assert_eq!(raw["text"], "hi");
    }

    #[test]
    fn test_plan_and_prompt() {
        let prompts = PromptCatalog::builtin().unwrap();
        let plan = MessageCoach.plan(MessageInput {
            message: "Hi, any update?".to_string(),
            company_type: CompanyType::Startup,
            has_connection: false,
            position: String::new(),
        });
        assert_eq!(plan.style.style, MessageStyle::Casual);

        let retrieval = &MessageCoach.retrievals(&plan)[0];
        assert_eq!(
            retrieval.query,
            "What makes a good follow-up email for a startup company? How should I structure it?"
        );

        let prompt = MessageCoach.prompt(&plan, &[], &prompts).unwrap().unwrap();
        assert_eq!(prompt.max_tokens, Some(1500));
        assert!(prompt.user.contains("Hi, any update?"));
        assert!(prompt.user.contains("Position: Not specified"));
        assert!(prompt.user.contains("Historical response rate: 73.3%"));
        assert!(prompt.user.contains("\"improved_message\""));
    }
}
