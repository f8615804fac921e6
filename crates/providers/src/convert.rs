//! Shared translation between domain messages and HTTP backends.

use std::time::Duration;

use tracing::warn;
use vaultmind_core::error::ProviderError;
use vaultmind_core::message::{ContentPart, MessageContent, Role};
use vaultmind_core::provider::ToolResultRole;

/// A message body reduced to what text-only chat APIs accept: one string
/// plus a side list of raw base64 images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatContent {
    pub text: String,
    pub images: Vec<String>,
}

/// Flatten message content. Text parts are joined with `\n`; images go to
/// the side list without any `data:` prefix.
pub fn flatten_content(content: &MessageContent) -> Result<FlatContent, ProviderError> {
    match content {
        MessageContent::Text(text) => Ok(FlatContent {
            text: text.clone(),
            images: Vec::new(),
        }),
        MessageContent::Parts(parts) => {
            let mut texts = Vec::new();
            let mut images = Vec::new();
            for part in parts {
                match part {
                    ContentPart::Text { text } => texts.push(text.as_str()),
                    ContentPart::Image { data } => {
                        images.push(vaultmind_core::strip_data_uri(data).to_string())
                    }
                    ContentPart::Unsupported => {
                        return Err(ProviderError::UnsupportedContent(
                            "message parts must be text or image".into(),
                        ));
                    }
                }
            }
            Ok(FlatContent {
                text: texts.join("\n"),
                images,
            })
        }
    }
}

/// Wire role name for a domain role.
///
/// Backends without a tool-result role get the observation as `user` or
/// `assistant` depending on `tool_result_role`. That remap is a
/// compatibility shim: the model loses the distinction between its own
/// words and tool output.
pub fn map_role(role: Role, tool_result_role: ToolResultRole) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::ToolResult => match tool_result_role {
            ToolResultRole::User => "user",
            ToolResultRole::Assistant => "assistant",
            ToolResultRole::Tool => "tool",
        },
    }
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("failed to create HTTP client: {e}")))
}

/// Map a transport failure.
pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Map a non-success HTTP status to a provider error; pass successes through.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    if status == 404 {
        let error_body = response.text().await.unwrap_or_default();
        warn!(status, model, body = %error_body, "Backend does not know the model");
        return Err(ProviderError::ModelNotFound(format!("{model}: {error_body}")));
    }

    if !response.status().is_success() {
        let error_body = response.text().await.unwrap_or_default();
        warn!(status, body = %error_body, "Backend returned error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

/// Decode a JSON body, mapping failures to `ApiError` with status 200.
pub(crate) async fn parse_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    response.json().await.map_err(|e| ProviderError::ApiError {
        status_code: 200,
        message: format!("Failed to parse response: {e}"),
    })
}
