//! The respond-to-user tool. Calling it ends the agent loop with the
//! `response` argument as the answer.

use async_trait::async_trait;
use vaultmind_core::error::ToolError;
use vaultmind_core::tool::{Tool, ToolOutput};

pub const QUERY_RESPONSE_TOOL: &str = "query-response";

pub struct QueryResponseTool;

#[async_trait]
impl Tool for QueryResponseTool {
    fn name(&self) -> &str {
        QUERY_RESPONSE_TOOL
    }

    fn description(&self) -> &str {
        "Provide a response to the user's query"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "response": {
                    "type": "string",
                    "description": "The final answer to the user's query"
                }
            },
            "required": ["response"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let response = arguments["response"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'response' argument".into()))?;
        Ok(ToolOutput::Text(response.to_string()))
    }
}
