//! Web search tool
//!
//! Queries the DuckDuckGo HTML endpoint and extracts result titles,
//! links, and snippets with CSS selectors, returning them as a markdown
//! list the model can read back.

use reqwest::Client;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Parameters, Property, Tool, ToolArgs, ToolContext, ToolDescriptor};
use crate::error::{BrainError, Result};

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = concat!("minibrain/", env!("CARGO_PKG_VERSION"));
const MAX_RESULTS: usize = 5;

/// Tool performing a web search for a query term.
///
/// # Parameters
/// - `query`: the term to search for (required)
pub struct SearchTool {
    client: Client,
    endpoint: String,
}

impl SearchTool {
    pub fn new() -> Self {
        Self::with_endpoint(SEARCH_ENDPOINT)
    }

    /// Custom endpoint, used by tests.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for SearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for SearchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "web_search".into(),
            description: "Perform a web search for the provided query and return results as markdown.".into(),
            parameters: Parameters {
                kind: "object".into(),
                required: vec!["query".into()],
                properties: [(
                    "query".to_string(),
                    Property::string("term to search for web results"),
                )]
                .into_iter()
                .collect(),
            },
        }
    }

    async fn execute(&self, args: &ToolArgs, ctx: &ToolContext) -> Result<String> {
        let query = args.require_str("query")?;
        check_cancelled(&ctx.cancel)?;
        debug!(query, "running web search");

        let fetch = async {
            let response = self
                .client
                .get(&self.endpoint)
                .query(&[("q", query)])
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .send()
                .await?;
            Ok::<String, BrainError>(response.error_for_status()?.text().await?)
        };
        let body = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(BrainError::Cancelled),
            body = fetch => body?,
        };

        let results = parse_results(&body);
        if results.is_empty() {
            return Ok(format!("No results found for {:?}.", query));
        }
        Ok(format_results(query, &results))
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(BrainError::Cancelled)
    } else {
        Ok(())
    }
}

struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

/// Extract results from the DuckDuckGo HTML page.
fn parse_results(html: &str) -> Vec<SearchResult> {
    // Selectors are static strings; parse failures would be a programming error.
    let result_sel = Selector::parse(".result").expect("valid selector");
    let title_sel = Selector::parse("a.result__a").expect("valid selector");
    let snippet_sel = Selector::parse(".result__snippet").expect("valid selector");

    let document = Html::parse_document(html);
    let mut results = Vec::new();
    for element in document.select(&result_sel).take(MAX_RESULTS) {
        let Some(anchor) = element.select(&title_sel).next() else {
            continue;
        };
        let title = anchor.text().collect::<String>().trim().to_string();
        let url = anchor.value().attr("href").unwrap_or_default().to_string();
        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title,
            url,
            snippet,
        });
    }
    results
}

fn format_results(query: &str, results: &[SearchResult]) -> String {
    let mut out = format!("Search results for {:?}:\n\n", query);
    for result in results {
        out.push_str(&format!("- [{}]({})\n", result.title, result.url));
        if !result.snippet.is_empty() {
            out.push_str(&format!("  {}\n", result.snippet));
        }
    }
    out
}
