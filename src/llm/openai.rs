//! OpenAI-compatible chat-completion backend.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use super::error::LlmError;
use super::{CompletionRequest, CompletionResponse, GenerationModel};

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub org_id: Option<String>,
}

impl OpenAiConfig {
    /// Read settings from `OPENAI_API_KEY`, `OPENAI_BASE_URL`,
    /// `OPENAI_MODEL` and `OPENAI_ORG_ID`. Returns `None` when no API
    /// key is present.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        Some(Self {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
            org_id: std::env::var("OPENAI_ORG_ID").ok(),
        })
    }
}

/// Chat-completion backend over HTTP.
pub struct OpenAiModel {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiModel {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn build_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|e| LlmError::InvalidRequest(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(org) = &self.config.org_id {
            headers.insert(
                "OpenAI-Organization",
                HeaderValue::from_str(org).map_err(|e| LlmError::InvalidRequest(e.to_string()))?,
            );
        }
        Ok(headers)
    }

    fn build_payload(&self, request: &CompletionRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        let mut payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
        });
        if let Some(temperature) = request.temperature {
            if let Some(num) = serde_json::Number::from_f64(temperature) {
                payload["temperature"] = Value::Number(num);
            }
        }
        if let Some(max_tokens) = request.max_tokens {
            payload["max_tokens"] = Value::Number(serde_json::Number::from(max_tokens));
        }
        payload
    }

    fn parse_response(body: &Value) -> Result<CompletionResponse, LlmError> {
        let content = body
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| LlmError::SerializationError("missing completion content".into()))?
            .to_string();

        let model = body
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        let usage = body.get("usage").cloned().unwrap_or(Value::Null);
        Ok(CompletionResponse {
            content,
            model,
            prompt_tokens: usage
                .get("prompt_tokens")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            completion_tokens: usage
                .get("completion_tokens")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
        })
    }

    fn map_error(status: u16, body: &str) -> LlmError {
        if status == 401 || status == 403 {
            return LlmError::AuthenticationError(body.to_string());
        }
        if status == 429 {
            return LlmError::RateLimitExceeded { retry_after: None };
        }
        LlmError::ApiError {
            status,
            message: body.to_string(),
        }
    }
}

#[async_trait]
impl GenerationModel for OpenAiModel {
    fn id(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let headers = self.build_headers()?;
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let payload = self.build_payload(&request);
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::map_error(status.as_u16(), &text));
        }

        let body: Value =
            serde_json::from_str(&text).map_err(|e| LlmError::SerializationError(e.to_string()))?;
        Self::parse_response(&body)
    }
}
