//! Mock provider for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizkit_core::error::ProviderError;
use quizkit_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, TokenUsage};

/// How a mock call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Retryable network error.
    Transient,
    /// Authentication failure, never retried.
    Permanent,
}

/// A mock provider for exercising the supply and session without real API
/// calls.
///
/// Responses are chosen by prompt substring, in insertion order. Every `{n}`
/// in a response is replaced with the 1-based call number, so one template
/// can produce distinct questions.
pub struct MockProvider {
    /// Prompt substring → response template.
    responses: Vec<(String, String)>,
    default_response: String,
    /// Calls numbered up to this value fail.
    fail_until: u32,
    failure: Option<MockFailure>,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    pub fn new(responses: Vec<(String, String)>) -> Self {
        Self {
            responses,
            default_response: String::new(),
            fail_until: 0,
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock that always answers with the same template.
    pub fn with_fixed_response(response: &str) -> Self {
        let mut mock = Self::new(Vec::new());
        mock.default_response = response.to_string();
        mock
    }

    /// A mock whose every call fails.
    pub fn failing(failure: MockFailure) -> Self {
        Self::new(Vec::new()).failing_first(u32::MAX, failure)
    }

    /// Fail the first `calls` calls, then answer normally.
    pub fn failing_first(mut self, calls: u32, failure: MockFailure) -> Self {
        self.fail_until = calls;
        self.failure = Some(failure);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        if let Some(failure) = self.failure {
            if call <= self.fail_until {
                let err = match failure {
                    MockFailure::Transient => {
                        ProviderError::NetworkError(format!("mock failure on call {call}"))
                    }
                    MockFailure::Permanent => {
                        ProviderError::AuthenticationFailed("mock key rejected".into())
                    }
                };
                return Err(err.into());
            }
        }

        let template = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map_or(self.default_response.as_str(), |(_, v)| v.as_str());
        let content = template.replace("{n}", &call.to_string());

        // Rough estimate
        let prompt_tokens = (request.prompt.len() / 4) as u32;
        let completion_tokens = (content.len() / 4) as u32;

        Ok(GenerateResponse {
            content,
            model: "mock-model".into(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }
}
