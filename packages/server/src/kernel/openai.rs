// OpenAI implementation of BaseAI and BaseEmbeddingService
//
// Plain REST over reqwest. Prompting decisions live in the workflow domain.

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::common::utils::truncate_for_log;
use crate::kernel::tools::{ToolBox, ToolCall};
use crate::kernel::traits::{BaseAI, BaseEmbeddingService, CompletionRequest, Message};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Upper bound on model round-trips inside one tool loop.
const MAX_TOOL_ITERATIONS: usize = 6;

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Result<Self, OpenAiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OpenAiError::Config("OPENAI_API_KEY not set".into()));
        }

        Ok(Self {
            http_client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
        })
    }

    /// Point at a compatible endpoint (proxy, Azure, local gateway).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn wire_messages(&self, request: &CompletionRequest) -> Vec<Value> {
        std::iter::once(Message::system(&request.system))
            .chain(request.messages.iter().cloned())
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect()
    }

    fn base_body(&self, request: &CompletionRequest, messages: &[Value]) -> Value {
        let model = request.model.as_deref().unwrap_or(&self.chat_model);
        let mut body = json!({
            "model": model,
            "messages": messages,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, OpenAiError> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, path = %path, "OpenAI request failed");
                OpenAiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(OpenAiError::Api(format!("{}: {}", status, error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| OpenAiError::Parse(e.to_string()))
    }

    async fn chat(&self, body: &Value) -> Result<Value, OpenAiError> {
        let start = Instant::now();
        let response = self.post("/chat/completions", body).await?;

        debug!(
            model = %body["model"],
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI chat completion"
        );

        response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .cloned()
            .ok_or_else(|| OpenAiError::Parse("No message in response".into()))
    }
}

fn message_text(message: &Value) -> String {
    message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

#[async_trait]
impl BaseAI for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let messages = self.wire_messages(&request);
        let body = self.base_body(&request, &messages);
        let message = self.chat(&body).await?;
        Ok(message_text(&message))
    }

    async fn complete_with_tools(
        &self,
        request: CompletionRequest,
        tools: &ToolBox,
    ) -> Result<String> {
        if tools.is_empty() {
            return self.complete(request).await;
        }

        let definitions = Value::Array(tools.definitions());
        let mut messages = self.wire_messages(&request);

        for iteration in 1..=MAX_TOOL_ITERATIONS {
            let mut body = self.base_body(&request, &messages);
            body["tools"] = definitions.clone();
            body["tool_choice"] = json!("auto");

            let message = self.chat(&body).await?;

            let tool_calls = message
                .get("tool_calls")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if tool_calls.is_empty() {
                let content = message_text(&message);
                info!(
                    iterations = iteration,
                    response_len = content.len(),
                    "Tool loop finished"
                );
                return Ok(content);
            }

            messages.push(message.clone());

            for raw in &tool_calls {
                let Some(call) = ToolCall::from_openai_value(raw) else {
                    warn!(raw = %raw, "Failed to parse tool call");
                    continue;
                };

                let result = tools.call(&call.name, &call.arguments).await;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": result
                }));
            }
        }

        warn!(max_iterations = MAX_TOOL_ITERATIONS, "Tool loop reached max iterations");
        Err(OpenAiError::Api(format!(
            "Tool loop reached max iterations ({})",
            MAX_TOOL_ITERATIONS
        ))
        .into())
    }

    async fn generate_structured(
        &self,
        request: CompletionRequest,
        schema: Value,
    ) -> Result<String> {
        let messages = self.wire_messages(&request);
        let mut body = self.base_body(&request, &messages);
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {
                "name": "structured_response",
                "strict": true,
                "schema": schema
            }
        });

        let message = self.chat(&body).await?;
        if let Some(refusal) = message.get("refusal").and_then(Value::as_str) {
            return Err(OpenAiError::Api(format!("Model refused: {}", refusal)).into());
        }

        let content = message_text(&message);
        debug!(preview = %truncate_for_log(&content, 200), "Structured output received");
        Ok(content)
    }
}

#[async_trait]
impl BaseEmbeddingService for OpenAiClient {
    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let body = serde_json::to_value(&request).map_err(|e| OpenAiError::Parse(e.to_string()))?;

        let response: EmbeddingResponse = serde_json::from_value(self.post("/embeddings", &body).await?)
            .map_err(|e| OpenAiError::Parse(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| OpenAiError::Api("No embedding returned".into()).into())
    }
}
