//! Deterministic in-process generation client.
//!
//! Backs the `echo` provider for offline runs and stands in for a real model
//! in tests. Every request is recorded so callers can inspect the prompts
//! that were sent.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use postapply_core::{AppError, AppResult};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Script {
    /// Always answer with the same text
    Fixed(String),
    /// Answer with the system prompt followed by the user message
    Echo,
    /// Always fail with the given message
    Fail(String),
}

/// Scripted LLM client.
#[derive(Debug)]
pub struct ScriptedClient {
    script: Script,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client that answers every request with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_script(Script::Fixed(text.into()))
    }

    /// Client that reflects its input back.
    pub fn echo() -> Self {
        Self::with_script(Script::Echo)
    }

    /// Client whose every call fails with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, request: &LlmRequest) {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.record(request);

        let content = match &self.script {
            Script::Fixed(text) => text.clone(),
            Script::Echo => match &request.system {
                Some(system) => format!("{}\n\n{}", system, request.prompt),
                None => request.prompt.clone(),
            },
            Script::Fail(message) => return Err(AppError::Llm(message.clone())),
        };

        Ok(LlmResponse {
            usage: LlmUsage::new(0, content.split_whitespace().count() as u32),
            content,
            model: request.model.clone(),
            done: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_records_requests() {
        let client = ScriptedClient::fixed("Wait three days.");
        let response = client
            .complete(&LlmRequest::new("When?", "m"))
            .await
            .unwrap();

        assert_eq!(response.content, "Wait three days.");
        assert_eq!(client.requests().len(), 1);
        assert_eq!(client.requests()[0].prompt, "When?");
    }

    #[tokio::test]
    async fn test_echo_includes_system() {
        let client = ScriptedClient::echo();
        let response = client
            .complete(&LlmRequest::new("question", "m").with_system("context"))
            .await
            .unwrap();
        assert_eq!(response.content, "context\n\nquestion");
    }

    #[tokio::test]
    async fn test_failing() {
        let client = ScriptedClient::failing("model unavailable");
        let err = client
            .complete(&LlmRequest::new("q", "m"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model unavailable"));
    }
}
