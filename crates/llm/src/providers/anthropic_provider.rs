use super::{InferenceProvider, InferenceRequest, InferenceResponse, TokenUsage};
use crate::error::{LlmError, LlmResult};
use async_trait::async_trait;
use common::{InferenceConfig, UpstreamError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages-API provider. No client-side retries: one request, one answer.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    default_max_tokens: u32,
    default_temperature: Option<f32>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
    model: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> LlmResult<Self> {
        let config = InferenceConfig {
            api_key: Some(api_key.into()),
            model: model.into(),
            ..InferenceConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &InferenceConfig) -> LlmResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .build()?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_max_tokens: config.max_tokens,
            default_temperature: Some(config.temperature),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> LlmResult<Self> {
        self.client = Client::builder()
            .connect_timeout(connect)
            .timeout(read)
            .build()?;
        Ok(self)
    }
}

#[async_trait]
impl InferenceProvider for AnthropicProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: InferenceRequest) -> LlmResult<InferenceResponse> {
        let start_time = Instant::now();

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(self.default_max_tokens),
            system: request.system_prompt.clone(),
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            temperature: request.temperature.or(self.default_temperature),
        };

        debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            "Sending inference request"
        );

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Inference API error");
            return Err(UpstreamError::new("inference", status.as_u16(), error_text).into());
        }

        let parsed: AnthropicResponse = serde_json::from_str(&response.text().await?)?;
        let content: String = parsed
            .content
            .iter()
            .filter(|block| block.kind.is_empty() || block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        info!(
            model = %self.model,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            tokens = usage.total_tokens,
            "Received inference response"
        );

        Ok(InferenceResponse {
            content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_rejected_before_any_request() {
        assert!(matches!(
            AnthropicProvider::new("", "claude"),
            Err(LlmError::MissingApiKey)
        ));
        assert!(matches!(
            AnthropicProvider::from_config(&InferenceConfig::default()),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[test]
    fn test_request_serializes_system_separately() {
        let body = AnthropicRequest {
            model: "m".to_string(),
            max_tokens: 10,
            system: Some("be brief".to_string()),
            messages: vec![AnthropicMessage {
                role: "user",
                content: "hi".to_string(),
            }],
            temperature: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["system"], "be brief");
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("temperature").is_none());
    }
}
