use super::{InferenceProvider, InferenceRequest, InferenceResponse, TokenUsage};
use crate::error::{LlmError, LlmResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Returns scripted answers in order and remembers every request it saw
#[derive(Debug, Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl MockProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().await.push_back(response.into());
    }

    pub async fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    fn model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: InferenceRequest) -> LlmResult<InferenceResponse> {
        let prompt_tokens = (request.prompt.len() / 4) as u32;
        self.requests.lock().await.push(request);
        let content = self
            .responses
            .lock()
            .await
            .pop_front()
            .ok_or(LlmError::MockExhausted)?;
        Ok(InferenceResponse {
            usage: TokenUsage::new(prompt_tokens, (content.len() / 4) as u32),
            content,
            model: "mock".to_string(),
        })
    }
}
