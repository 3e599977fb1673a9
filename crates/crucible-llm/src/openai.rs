use async_trait::async_trait;
use serde_json::json;

use crate::{CompletionRequest, CompletionResponse, ProviderAdapter};
use crucible_types::CrucibleError;

// ---------------------------------------------------------------------------
// OpenAiAdapter
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.openai.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn from_env() -> Result<Self, CrucibleError> {
        let key = std::env::var("OPENAI_API_KEY").map_err(|_| CrucibleError::AuthError {
            provider: "openai".into(),
        })?;
        Ok(Self::new(key))
    }
}

// ---------------------------------------------------------------------------
// Request / response translation
// ---------------------------------------------------------------------------

fn build_request_body(request: &CompletionRequest) -> serde_json::Value {
    let mut messages = Vec::new();
    if !request.system.is_empty() {
        messages.push(json!({ "role": "system", "content": request.system }));
    }
    messages.push(json!({ "role": "user", "content": request.prompt }));

    let mut body = json!({
        "model": request.model,
        "max_completion_tokens": request.max_tokens,
        "messages": messages,
    });

    if let Some(temp) = request.temperature {
        body["temperature"] = json!(temp);
    }

    body
}

fn parse_response(body: &serde_json::Value) -> CompletionResponse {
    let model = body["model"].as_str().unwrap_or("").to_string();
    let text = body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    CompletionResponse { text, model }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_error(status: reqwest::StatusCode, body: &str) -> CrucibleError {
    let status_u16 = status.as_u16();
    match status_u16 {
        429 => CrucibleError::RateLimited {
            provider: "openai".into(),
            retry_after_ms: 1000,
        },
        401 => CrucibleError::AuthError {
            provider: "openai".into(),
        },
        500 | 502 | 503 => CrucibleError::ProviderError {
            provider: "openai".into(),
            status: status_u16,
            message: extract_error_message(body),
            retryable: true,
        },
        _ => CrucibleError::ProviderError {
            provider: "openai".into(),
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
impl ProviderAdapter for OpenAiAdapter {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, CrucibleError> {
        let body = build_request_body(request);

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CrucibleError::ProviderError {
                provider: "openai".into(),
                status: 0,
                message: e.to_string(),
                retryable: true,
            })?;

        let status = resp.status();
        let response_body = resp.text().await.map_err(|e| CrucibleError::ProviderError {
            provider: "openai".into(),
            status: 0,
            message: e.to_string(),
            retryable: true,
        })?;

        if !status.is_success() {
            return Err(map_error(status, &response_body));
        }

        let json: serde_json::Value =
            serde_json::from_str(&response_body).map_err(|e| CrucibleError::ProviderError {
                provider: "openai".into(),
                status: status.as_u16(),
                message: format!("Failed to parse response JSON: {e}"),
                retryable: false,
            })?;

        Ok(parse_response(&json))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        "gpt-4o"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_request_body_has_system_then_user() {
        let req = CompletionRequest::new("gpt-4o", "Be terse.", "Evaluate this");
        let body = build_request_body(&req);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Be terse.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(body["max_completion_tokens"], 4096);
    }

    #[test]
    fn build_request_body_without_system_has_single_message() {
        let req = CompletionRequest::new("gpt-4o", "", "p");
        let body = build_request_body(&req);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn parse_response_reads_first_choice() {
        let body = json!({
            "model": "gpt-4o",
            "choices": [
                {"message": {"role": "assistant", "content": "the answer"}}
            ]
        });
        let resp = parse_response(&body);
        assert_eq!(resp.text, "the answer");
        assert_eq!(resp.model, "gpt-4o");
    }

    #[test]
    fn parse_response_tolerates_missing_choices() {
        let resp = parse_response(&json!({"model": "gpt-4o"}));
        assert_eq!(resp.text, "");
    }

    #[test]
    fn from_env_returns_auth_error_when_key_not_set() {
        std::env::remove_var("OPENAI_API_KEY");
        let result = OpenAiAdapter::from_env();
        assert!(matches!(
            result,
            Err(CrucibleError::AuthError { provider }) if provider == "openai"
        ));
    }

    #[test]
    fn error_mapping_503_retryable() {
        let err = map_error(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error": {"message": "overloaded"}}"#,
        );
        match &err {
            CrucibleError::ProviderError { retryable, .. } => assert!(*retryable),
            _ => panic!("expected ProviderError"),
        }
    }
}
