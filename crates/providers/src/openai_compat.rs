//! OpenAI-compatible adapter implementation.
//!
//! Works with LM Studio, llama.cpp server, vLLM, Ollama's `/v1` shim and
//! any endpoint exposing `/chat/completions`. Tool results keep their
//! genuine `tool` role unless configured otherwise.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vaultmind_core::error::ProviderError;
use vaultmind_core::message::{ContentPart, Message, MessageContent, Role};
use vaultmind_core::provider::*;

use crate::convert::{build_client, check_status, map_role, parse_body, transport_error};

/// An OpenAI-compatible chat backend.
pub struct OpenAiCompatAdapter {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    tool_result_role: ToolResultRole,
}

impl OpenAiCompatAdapter {
    /// Create a new adapter. `base_url` includes any `/v1` suffix.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: build_client(timeout)?,
            tool_result_role: ToolResultRole::Tool,
        })
    }

    /// Override the wire role used for tool results.
    pub fn with_tool_result_role(mut self, role: ToolResultRole) -> Self {
        self.tool_result_role = role;
        self
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(&self, messages: &[Message]) -> Result<Vec<ApiMessage>, ProviderError> {
        messages
            .iter()
            .map(|m| {
                let role = map_role(m.role, self.tool_result_role);
                let content = match &m.content {
                    MessageContent::Text(text) => ApiContent::Text(text.clone()),
                    MessageContent::Parts(parts) => ApiContent::Parts(
                        parts
                            .iter()
                            .map(to_api_part)
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                };
                let tool_call_id = if m.role == Role::ToolResult && role == "tool" {
                    m.tool_call_id.clone()
                } else {
                    None
                };
                Ok(ApiMessage {
                    role: role.to_string(),
                    content,
                    tool_call_id,
                })
            })
            .collect()
    }
}

fn to_api_part(part: &ContentPart) -> Result<ApiPart, ProviderError> {
    match part {
        ContentPart::Text { text } => Ok(ApiPart::Text { text: text.clone() }),
        // Stored as raw base64; the wire wants a data URI. The MIME type is
        // not tracked, and backends accept a generic image type.
        ContentPart::Image { data } => Ok(ApiPart::ImageUrl {
            image_url: ApiImageUrl {
                url: format!("data:image/jpeg;base64,{data}"),
            },
        }),
        ContentPart::Unsupported => Err(ProviderError::UnsupportedContent(
            "message parts must be text or image".into(),
        )),
    }
}

#[async_trait]
impl ModelAdapter for OpenAiCompatAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": self.to_api_messages(&request.messages)?,
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, &request.model).await?;
        let api_response: ApiResponse = parse_body(response).await?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatResponse {
            text: choice.message.content.unwrap_or_default(),
            model: api_response.model.unwrap_or(request.model),
            usage,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, &request.model).await?;
        let api_resp: EmbeddingApiResponse = parse_body(response).await?;

        Ok(EmbeddingResponse {
            embeddings: api_resp.data.into_iter().map(|d| d.embedding).collect(),
            model: api_resp.model.unwrap_or(request.model),
        })
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: ApiContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Parts(Vec<ApiPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiPart {
    Text { text: String },
    ImageUrl { image_url: ApiImageUrl },
}

#[derive(Debug, Serialize)]
struct ApiImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> OpenAiCompatAdapter {
        OpenAiCompatAdapter::new("openai", server.uri(), "sk-test", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn message_conversion_keeps_tool_role() {
        let adapter =
            OpenAiCompatAdapter::new("openai", "http://x/v1", "k", Duration::from_secs(1)).unwrap();
        let messages = vec![
            Message::system("You are helpful"),
            Message::tool_request("call_0", "{}"),
            Message::tool_result("call_0", "42"),
        ];
        let api = adapter.to_api_messages(&messages).unwrap();
        assert_eq!(api[0].role, "system");
        assert_eq!(api[1].role, "assistant");
        assert!(api[1].tool_call_id.is_none());
        assert_eq!(api[2].role, "tool");
        assert_eq!(api[2].tool_call_id.as_deref(), Some("call_0"));
    }

    #[test]
    fn remapped_tool_result_drops_call_id() {
        let adapter =
            OpenAiCompatAdapter::new("openai", "http://x/v1", "k", Duration::from_secs(1))
                .unwrap()
                .with_tool_result_role(ToolResultRole::User);
        let api = adapter
            .to_api_messages(&[Message::tool_result("call_0", "42")])
            .unwrap();
        assert_eq!(api[0].role, "user");
        assert!(api[0].tool_call_id.is_none());
    }

    #[test]
    fn images_become_data_uris() {
        let part = to_api_part(&ContentPart::image("abcd")).unwrap();
        let value = serde_json::to_value(part).unwrap();
        assert_eq!(value["type"], "image_url");
        assert_eq!(value["image_url"]["url"], "data:image/jpeg;base64,abcd");
    }

    #[tokio::test]
    async fn complete_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "mistral", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-123",
                "model": "mistral",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello!"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 15, "total_tokens": 27}
            })))
            .mount(&server)
            .await;

        let response = adapter(&server)
            .complete(ChatRequest::new("mistral", vec![Message::user("Hello?")]))
            .await
            .unwrap();
        assert_eq!(response.text, "Hello!");
        assert_eq!(response.usage.unwrap().total_tokens, 27);
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        fn kind(e: &ProviderError) -> &'static str {
            match e {
                ProviderError::RateLimited { .. } => "rate_limited",
                ProviderError::AuthenticationFailed(_) => "auth",
                ProviderError::ModelNotFound(_) => "model_not_found",
                ProviderError::ApiError { .. } => "api",
                _ => "other",
            }
        }

        for (status, expected) in [
            (429u16, "rate_limited"),
            (401, "auth"),
            (403, "auth"),
            (404, "model_not_found"),
            (502, "api"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let err = adapter(&server)
                .complete(ChatRequest::new("mistral", vec![Message::user("hi")]))
                .await
                .unwrap_err();
            assert_eq!(kind(&err), expected, "status {status} mapped to {err:?}");
        }
    }

    #[tokio::test]
    async fn garbage_body_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .complete(ChatRequest::new("mistral", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 200, .. }));
    }

    #[tokio::test]
    async fn embeddings_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "text-embedding-3-small",
                "data": [{"embedding": [1.0, 0.0]}, {"embedding": [0.0, 1.0]}]
            })))
            .mount(&server)
            .await;

        let response = adapter(&server)
            .embed(EmbeddingRequest {
                model: "text-embedding-3-small".into(),
                inputs: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(response.embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
