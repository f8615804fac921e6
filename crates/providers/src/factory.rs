//! Adapter factory — builds the configured chat backend.

use std::sync::Arc;
use std::time::Duration;

use vaultmind_config::{AppConfig, ConfigError};
use vaultmind_core::provider::ModelAdapter;

use crate::ollama::OllamaAdapter;
use crate::openai_compat::OpenAiCompatAdapter;

/// Build the adapter selected by `llm.provider` (`"ollama"` or `"openai"`).
pub fn build_adapter(config: &AppConfig) -> Result<Arc<dyn ModelAdapter>, ConfigError> {
    let llm = &config.llm;
    let timeout = Duration::from_secs(llm.request_timeout_secs);
    let client_err = |e: vaultmind_core::ProviderError| ConfigError::ValidationError(e.to_string());

    let adapter: Arc<dyn ModelAdapter> = match llm.provider.as_str() {
        "ollama" => {
            let mut adapter = OllamaAdapter::new(&llm.base_url, timeout).map_err(client_err)?;
            if let Some(role) = llm.tool_result_role {
                adapter = adapter.with_tool_result_role(role);
            }
            Arc::new(adapter)
        }
        "openai" => {
            let mut adapter =
                OpenAiCompatAdapter::new("openai", &llm.base_url, &llm.api_key, timeout)
                    .map_err(client_err)?;
            if let Some(role) = llm.tool_result_role {
                adapter = adapter.with_tool_result_role(role);
            }
            Arc::new(adapter)
        }
        other => {
            return Err(ConfigError::ValidationError(format!(
                "unknown llm.provider '{other}' (expected \"ollama\" or \"openai\")"
            )));
        }
    };

    tracing::debug!(provider = %adapter.name(), base_url = %llm.base_url, "Built model adapter");
    Ok(adapter)
}
