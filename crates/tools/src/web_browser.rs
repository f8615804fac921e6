//! Web browser tool — fetches a page, extracts its readable text and links,
//! and has the model carry out a task (by default, a summary) over it.
//!
//! Failures to reach or read the page are returned as a plain sentence
//! rather than an error, so the model can explain the problem to the user.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;
use vaultmind_core::error::ToolError;
use vaultmind_core::message::Message;
use vaultmind_core::provider::{ChatRequest, ModelAdapter};
use vaultmind_core::retrieval::{Document, Embedder, VectorStore};
use vaultmind_core::tool::{Tool, ToolOutput};
use vaultmind_vectors::{InMemoryVectorStore, MarkdownSplitter};

pub const WEB_BROWSER_TOOL: &str = "web-browser";

const DEFAULT_TASK: &str = "create a summary";

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "application/json",
    "application/xml",
    "application/javascript",
    "text/plain",
];

/// Elements whose text is never shown to the model.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "svg"];

/// Browser-like request headers. `Host` and `Alt-Used` are filled in per
/// request with the target's host.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", "en-US,en;q=0.5"),
    ("connection", "keep-alive"),
    ("referer", "https://www.google.com/"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "cross-site"),
    ("upgrade-insecure-requests", "1"),
    (
        "user-agent",
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/111.0",
    ),
];

pub struct WebBrowserTool {
    adapter: Arc<dyn ModelAdapter>,
    model: String,
    client: reqwest::Client,
    embedder: Option<Arc<dyn Embedder>>,
    splitter: MarkdownSplitter,
    max_context_chunks: usize,
}

impl WebBrowserTool {
    pub fn new(adapter: Arc<dyn ModelAdapter>, model: impl Into<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::execution(WEB_BROWSER_TOOL, e))?;

        Ok(Self {
            adapter,
            model: model.into(),
            client,
            embedder: None,
            splitter: MarkdownSplitter::new(2000, 200),
            max_context_chunks: 10,
        })
    }

    /// Rank page chunks by similarity to the task instead of taking the
    /// first ones.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_max_context_chunks(mut self, max: usize) -> Self {
        self.max_context_chunks = max.max(1);
        self
    }

    async fn fetch(&self, url: &Url) -> Result<String, String> {
        let response = self
            .client
            .get(url.clone())
            .headers(browser_headers(url))
            .send()
            .await
            .map_err(|e| format!("There was a problem connecting to the site: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("The site returned HTTP {}", response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase());
        if let Some(content_type) = content_type
            && !content_type.is_empty()
            && !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str())
        {
            return Err(format!(
                "The page could not be read: content type '{content_type}' is not text"
            ));
        }

        response
            .text()
            .await
            .map_err(|e| format!("The page could not be read: {e}"))
    }

    /// Pick the page chunks most relevant to `task`, joined for the prompt.
    async fn context(&self, text: &str, task: &str) -> String {
        let chunks = self.splitter.split_text(text);

        if let Some(embedder) = &self.embedder {
            let store = InMemoryVectorStore::new(embedder.clone());
            let documents = chunks.iter().map(|c| Document::new(c.as_str())).collect();
            let ranked = match store.add_documents(documents, None).await {
                Ok(_) => store.similarity_search(task, self.max_context_chunks).await,
                Err(e) => Err(e),
            };
            match ranked {
                Ok(ranked) => {
                    return ranked
                        .into_iter()
                        .map(|r| r.document.content)
                        .collect::<Vec<_>>()
                        .join("\n\n");
                }
                Err(e) => warn!(error = %e, "Ranking page chunks failed, using leading chunks"),
            }
        }

        chunks
            .into_iter()
            .take(self.max_context_chunks)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn browser_headers(url: &Url) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in BROWSER_HEADERS {
        headers.insert(*name, HeaderValue::from_static(*value));
    }
    if let Some(host) = url.host_str()
        && let Ok(value) = HeaderValue::from_str(host)
    {
        headers.insert(reqwest::header::HOST, value.clone());
        headers.insert(HeaderName::from_static("alt-used"), value);
    }
    headers
}

/// Accept the legacy single-string form `"url, task"`.
fn parse_inputs(input: &str) -> (String, Option<String>) {
    let mut parts = input.splitn(2, ',').map(|part| {
        let part = part.trim();
        let part = part.strip_prefix('"').unwrap_or(part);
        let part = part.strip_suffix('"').unwrap_or(part);
        part.strip_suffix('/').unwrap_or(part).trim().to_string()
    });
    let url = parts.next().unwrap_or_default();
    let task = parts.next().filter(|t| !t.is_empty());
    (url, task)
}

/// Readable text of a page.
///
/// Each element contributes its own text (not its children's). Links
/// become `[text](absolute-url)`. With `body_only`, the head is skipped.
pub fn extract_text(html: &str, base: &Url, body_only: bool) -> String {
    let document = Html::parse_document(html);
    let (Ok(all), Ok(img_alt)) = (
        Selector::parse(if body_only { "body *" } else { "*" }),
        Selector::parse("img[alt]"),
    ) else {
        return String::new();
    };

    let mut pieces: Vec<String> = Vec::new();
    for element in document.select(&all) {
        if is_skipped(&element) {
            continue;
        }

        let own_text: String = element
            .children()
            .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
            .collect();
        let mut content = own_text.trim().to_string();

        if element.value().name() == "a"
            && let Some(href) = element.value().attr("href")
        {
            let href = base.join(href).map(|u| u.to_string()).unwrap_or_default();
            if let Some(alt) = element
                .select(&img_alt)
                .next()
                .and_then(|img| img.value().attr("alt"))
                .map(str::trim)
                .filter(|alt| !alt.is_empty())
            {
                content.push(' ');
                content.push_str(alt);
            }
            pieces.push(format!("[{}]({href})", content.trim()));
        } else if !content.is_empty() {
            pieces.push(content);
        }
    }

    pieces
        .join(" ")
        .split('\n')
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn is_skipped(element: &ElementRef<'_>) -> bool {
    SKIPPED_ELEMENTS.contains(&element.value().name())
        || element.ancestors().any(|node| {
            node.value()
                .as_element()
                .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
        })
}

fn summarize_prompt(task: &str, context: &str) -> String {
    format!(
        "Using the text below, you need to:\n\
         1. {task}\n\
         2. Provide up to 5 markdown links from within that would be of interest (always including URL and text). \
         Links should be provided, if present, in markdown syntax as a list under the heading \"Relevant Links:\".\n\
         =====\n\
         Text:\n\
         {context}\n"
    )
}

#[async_trait]
impl Tool for WebBrowserTool {
    fn name(&self) -> &str {
        WEB_BROWSER_TOOL
    }

    fn description(&self) -> &str {
        "navigates to a URL and retrieves a summary or data"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to navigate to"
                },
                "task": {
                    "type": "string",
                    "description": "What to retrieve from the URL, e.g. summary"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let (raw_url, task) = match &arguments {
            serde_json::Value::String(input) => parse_inputs(input),
            _ => (
                arguments["url"]
                    .as_str()
                    .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?
                    .to_string(),
                arguments["task"].as_str().map(str::to_string),
            ),
        };

        let summary = task
            .as_deref()
            .is_none_or(|t| t.trim().is_empty() || t.trim() == "summary");
        let task = if summary {
            DEFAULT_TASK.to_string()
        } else {
            task.unwrap_or_default()
        };

        let url = match Url::parse(raw_url.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                return Ok(ToolOutput::Text(format!(
                    "'{raw_url}' is not a valid http(s) URL"
                )));
            }
        };

        debug!(url = %url, task = %task, "Browsing page");

        let html = match self.fetch(&url).await {
            Ok(html) => html,
            Err(message) => return Ok(ToolOutput::Text(message)),
        };

        let text = extract_text(&html, &url, summary);
        if text.is_empty() {
            return Ok(ToolOutput::Text("The page had no readable text.".into()));
        }

        let context = self.context(&text, &task).await;
        let request = ChatRequest::new(
            self.model.clone(),
            vec![Message::user(summarize_prompt(&task, &context))],
        );

        match self.adapter.complete(request).await {
            Ok(response) => Ok(ToolOutput::Text(response.text)),
            Err(e) => Ok(ToolOutput::Text(format!(
                "There was a problem summarizing the page: {e}"
            ))),
        }
    }
}
