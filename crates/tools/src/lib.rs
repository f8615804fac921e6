//! Built-in tools for VaultMind.
//!
//! Tools give the agent its reach beyond the conversation: searching the
//! user's notes, reading a web page, and handing the final response back.

pub mod query_response;
pub mod retriever_tool;
pub mod web_browser;

use std::sync::Arc;

use vaultmind_core::error::ToolError;
use vaultmind_core::provider::ModelAdapter;
use vaultmind_core::retrieval::{Embedder, Retriever};
use vaultmind_core::tool::ToolRegistry;

pub use query_response::{QUERY_RESPONSE_TOOL, QueryResponseTool};
pub use retriever_tool::{RETRIEVER_TOOL, RetrieverTool};
pub use web_browser::{WEB_BROWSER_TOOL, WebBrowserTool};

/// Create the default tool registry: note retrieval, web browsing and the
/// final-response tool, in that order.
///
/// `embedder`, when given, lets the browser rank page chunks against the
/// task.
pub fn default_registry(
    adapter: Arc<dyn ModelAdapter>,
    model: impl Into<String>,
    retriever: Arc<dyn Retriever>,
    embedder: Option<Arc<dyn Embedder>>,
) -> Result<ToolRegistry, ToolError> {
    let mut browser = WebBrowserTool::new(adapter, model)?;
    if let Some(embedder) = embedder {
        browser = browser.with_embedder(embedder);
    }

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(RetrieverTool::new(retriever)))?;
    registry.register(Box::new(browser))?;
    registry.register(Box::new(QueryResponseTool))?;
    Ok(registry)
}
