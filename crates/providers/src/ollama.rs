//! Ollama adapter using the native `/api/chat` endpoint.
//!
//! Images travel as a per-message side list of raw base64 strings, and
//! tool results are sent under a role Ollama accepts (see [`map_role`]).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vaultmind_core::error::ProviderError;
use vaultmind_core::message::Message;
use vaultmind_core::provider::*;

use crate::convert::{build_client, check_status, flatten_content, map_role, parse_body, transport_error};

/// Talks to a local (or remote) Ollama server.
pub struct OllamaAdapter {
    base_url: String,
    client: reqwest::Client,
    tool_result_role: ToolResultRole,
}

impl OllamaAdapter {
    /// Create an adapter for the server at `base_url` (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
            tool_result_role: ToolResultRole::Assistant,
        })
    }

    /// Override the wire role used for tool results.
    pub fn with_tool_result_role(mut self, role: ToolResultRole) -> Self {
        self.tool_result_role = role;
        self
    }

    fn to_api_messages(&self, messages: &[Message]) -> Result<Vec<ApiMessage>, ProviderError> {
        messages
            .iter()
            .map(|m| {
                let flat = flatten_content(&m.content)?;
                Ok(ApiMessage {
                    role: map_role(m.role, self.tool_result_role).to_string(),
                    content: flat.text,
                    images: flat.images,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ModelAdapter for OllamaAdapter {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let body = ApiRequest {
            model: &request.model,
            messages: self.to_api_messages(&request.messages)?,
            stream: false,
            options: ApiOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        debug!(model = %request.model, messages = body.messages.len(), "Sending Ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, &request.model).await?;
        let api_response: ApiResponse = parse_body(response).await?;

        let usage = match (api_response.prompt_eval_count, api_response.eval_count) {
            (None, None) => None,
            (prompt, completion) => {
                let prompt_tokens = prompt.unwrap_or(0);
                let completion_tokens = completion.unwrap_or(0);
                Some(Usage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                })
            }
        };

        Ok(ChatResponse {
            text: api_response.message.content,
            model: api_response.model.unwrap_or(request.model),
            usage,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/api/embeddings", self.base_url);

        debug!(model = %request.model, count = request.inputs.len(), "Sending Ollama embedding requests");

        // One prompt per call on this endpoint
        let mut embeddings = Vec::with_capacity(request.inputs.len());
        for input in &request.inputs {
            let response = self
                .client
                .post(&url)
                .json(&serde_json::json!({ "model": request.model, "prompt": input }))
                .send()
                .await
                .map_err(transport_error)?;
            let response = check_status(response, &request.model).await?;
            let api_resp: EmbeddingApiResponse = parse_body(response).await?;
            embeddings.push(api_resp.embedding);
        }

        Ok(EmbeddingResponse {
            embeddings,
            model: request.model,
        })
    }
}

// --- Ollama API types ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    stream: bool,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    message: ApiMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    embedding: Vec<f32>,
}
