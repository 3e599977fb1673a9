use async_trait::async_trait;
use serde_json::json;

use crate::{CompletionRequest, CompletionResponse, ProviderAdapter};
use crucible_types::CrucibleError;

// ---------------------------------------------------------------------------
// AnthropicAdapter
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn from_env() -> Result<Self, CrucibleError> {
        let key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| CrucibleError::AuthError {
            provider: "anthropic".into(),
        })?;
        Ok(Self::new(key))
    }
}

// ---------------------------------------------------------------------------
// Request / response translation
// ---------------------------------------------------------------------------

fn build_request_body(request: &CompletionRequest) -> serde_json::Value {
    let mut body = json!({
        "model": request.model,
        "max_tokens": request.max_tokens,
        "messages": [{ "role": "user", "content": request.prompt }],
    });

    if !request.system.is_empty() {
        body["system"] = json!(request.system);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = json!(temp);
    }

    body
}

fn parse_response(body: &serde_json::Value) -> CompletionResponse {
    let model = body["model"].as_str().unwrap_or("").to_string();

    let mut text_parts: Vec<String> = Vec::new();
    if let Some(content) = body["content"].as_array() {
        for block in content {
            if block["type"].as_str() == Some("text") {
                if let Some(t) = block["text"].as_str() {
                    text_parts.push(t.to_string());
                }
            }
        }
    }

    CompletionResponse {
        text: text_parts.join(""),
        model,
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_error(status: reqwest::StatusCode, body: &str) -> CrucibleError {
    let status_u16 = status.as_u16();
    match status_u16 {
        429 => {
            let retry_ms = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v["error"]["retry_after"].as_f64())
                .map(|s| (s * 1000.0) as u64)
                .unwrap_or(1000);
            CrucibleError::RateLimited {
                provider: "anthropic".into(),
                retry_after_ms: retry_ms,
            }
        }
        401 => CrucibleError::AuthError {
            provider: "anthropic".into(),
        },
        500 | 529 => CrucibleError::ProviderError {
            provider: "anthropic".into(),
            status: status_u16,
            message: extract_error_message(body),
            retryable: true,
        },
        _ => CrucibleError::ProviderError {
            provider: "anthropic".into(),
            status: status_u16,
            message: extract_error_message(body),
            retryable: false,
        },
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

// ---------------------------------------------------------------------------
// ProviderAdapter implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, CrucibleError> {
        let body = build_request_body(request);

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CrucibleError::ProviderError {
                provider: "anthropic".into(),
                status: 0,
                message: e.to_string(),
                retryable: true,
            })?;

        let status = resp.status();
        let response_body = resp.text().await.map_err(|e| CrucibleError::ProviderError {
            provider: "anthropic".into(),
            status: 0,
            message: e.to_string(),
            retryable: true,
        })?;

        if !status.is_success() {
            return Err(map_error(status, &response_body));
        }

        let json: serde_json::Value =
            serde_json::from_str(&response_body).map_err(|e| CrucibleError::ProviderError {
                provider: "anthropic".into(),
                status: status.as_u16(),
                message: format!("Failed to parse response JSON: {e}"),
                retryable: false,
            })?;

        Ok(parse_response(&json))
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        "claude-sonnet-4-5-20250929"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
