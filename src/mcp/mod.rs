//! MCP module - remote tool provider integration
//!
//! Connects to external MCP (Model Context Protocol) servers, discovers
//! the tools they expose, and normalizes their heterogeneous parameter
//! schemas into the uniform [`ToolDescriptor`] shape the model backend
//! understands. Discovered tools register in the ordinary
//! [`ToolRegistry`](crate::tools::ToolRegistry) as [`RemoteTool`]s, so
//! the agent loop treats them exactly like local tools.
//!
//! Discovery is paginated: [`discover`] follows the provider's
//! continuation cursor across pages until none remains, and propagates
//! any page-fetch or translation error immediately without retry — no
//! partial tool list is silently accepted.

mod client;
mod schema;

pub use client::{McpClient, RemoteTool};
pub use schema::{discover, translate};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Raw tool metadata as reported by a remote provider.
#[derive(Debug, Clone)]
pub struct RemoteToolInfo {
    pub name: String,
    pub description: String,
    /// The provider's parameter schema, untranslated.
    pub input_schema: Value,
}

/// One page of a paginated tool listing.
#[derive(Debug, Clone, Default)]
pub struct ToolPage {
    pub tools: Vec<RemoteToolInfo>,
    /// Continuation cursor; `None` signals the end of pagination.
    pub next_cursor: Option<String>,
}

/// Boundary to a remote tool provider.
///
/// Implemented by [`McpClient`]; tests supply scripted fakes.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Fetch one page of tool metadata, starting from `cursor`.
    async fn list_tools(&self, cursor: Option<&str>) -> Result<ToolPage>;

    /// Invoke a remote tool and return its textual output.
    async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<String>;
}
