//! Model client for services that speak the OpenAI-compatible
//! `/chat/completions` API (Bedrock access gateways, LiteLLM proxies, vLLM).

use super::http_client::build_model_client_with_timeout;
use super::traits::{ModelClient, ModelFuture};
use super::types::{ModelRequest, ModelResponse, TokenUsage};
use crate::error::ModelCallError;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_API_ERROR_CHARS: usize = 200;
const SECRET_MARKERS: &[&str] = &["Bearer ", "sk-", "api_key=", "x-api-key: "];

pub struct OpenAiCompatibleClient {
    base_url: String,
    api_key: Option<String>,
    /// Pre-computed chat completions URL (avoids `format!` per request).
    cached_chat_url: String,
    client: Client,
}

impl OpenAiCompatibleClient {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout_secs: u64) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let cached_chat_url = if base_url.ends_with("chat/completions") {
            base_url.clone()
        } else {
            format!("{base_url}/chat/completions")
        };

        Self {
            base_url,
            api_key: api_key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(ToString::to_string),
            cached_chat_url,
            client: build_model_client_with_timeout(timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_completions_url(&self) -> &str {
        &self.cached_chat_url
    }

    async fn send(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelCallError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: request.prompt,
        });

        let body = ChatRequest {
            model: request.model,
            messages,
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
        };

        let mut builder = self.client.post(self.chat_completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read model service error body>".to_string());
            return Err(status_error(status, &text, retry_after));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ModelCallError::permanent("invalid_response", sanitize_api_error(&e.to_string()))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                ModelCallError::transient("empty_response", "model returned no content")
            })?;

        Ok(ModelResponse {
            text,
            usage: parsed.usage.map(|usage| TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            }),
            model: parsed.model,
        })
    }
}

impl ModelClient for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn complete<'a>(&'a self, request: ModelRequest<'a>) -> ModelFuture<'a> {
        Box::pin(self.send(request))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

fn transport_error(err: reqwest::Error) -> ModelCallError {
    let code = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else {
        "transport"
    };
    ModelCallError::transient(code, sanitize_api_error(&err.to_string()))
}

/// Map a non-success HTTP reply to a typed failure. The provider's own error
/// code wins over the numeric status when the body carries one.
fn status_error(status: StatusCode, body: &str, retry_after: Option<Duration>) -> ModelCallError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let provider_code = parsed.as_ref().and_then(|envelope| {
        let code = match &envelope.error.code {
            Some(serde_json::Value::String(code)) if !code.is_empty() => Some(code.clone()),
            Some(serde_json::Value::Number(code)) => Some(code.to_string()),
            _ => None,
        };
        code.or_else(|| envelope.error.kind.clone())
    });
    let message = parsed
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| body.to_string());

    let code = provider_code.unwrap_or_else(|| status.as_u16().to_string());
    let message = sanitize_api_error(&message);

    match status {
        StatusCode::TOO_MANY_REQUESTS => ModelCallError::RateLimited {
            code,
            message,
            retry_after,
        },
        StatusCode::REQUEST_TIMEOUT => ModelCallError::Transient { code, message },
        s if s.is_server_error() => ModelCallError::Transient { code, message },
        _ => ModelCallError::Permanent { code, message },
    }
}

fn scrub_after_marker(scrubbed: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let start = search_from + rel;
        let content_start = start + marker.len();
        let end = scrubbed[content_start..]
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .map_or(scrubbed.len(), |(i, _)| content_start + i);

        if end == content_start {
            search_from = content_start;
            continue;
        }

        scrubbed.replace_range(start..end, "[REDACTED]");
        search_from = start + "[REDACTED]".len();
    }
}

/// Redact credential-looking tokens and cap the length of an error body.
pub fn sanitize_api_error(input: &str) -> String {
    let mut scrubbed = input.to_string();
    for marker in SECRET_MARKERS {
        scrub_after_marker(&mut scrubbed, marker);
    }

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &scrubbed[..end])
}
