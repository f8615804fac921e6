//! Note retrieval tool — lets the model search the user's notes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vaultmind_core::error::ToolError;
use vaultmind_core::retrieval::Retriever;
use vaultmind_core::tool::{Tool, ToolOutput};

pub const RETRIEVER_TOOL: &str = "retriever-tool";

pub struct RetrieverTool {
    retriever: Arc<dyn Retriever>,
}

impl RetrieverTool {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str {
        RETRIEVER_TOOL
    }

    fn description(&self) -> &str {
        "retrieves information from the user's notes"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The query to search for"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let documents = self
            .retriever
            .retrieve(query)
            .await
            .map_err(|e| ToolError::execution(RETRIEVER_TOOL, e))?;
        debug!(query, passages = documents.len(), "Retrieved note passages");

        if documents.is_empty() {
            return Ok(ToolOutput::Text("No matching notes found.".into()));
        }

        Ok(ToolOutput::Text(
            documents
                .iter()
                .map(|d| d.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        ))
    }
}
