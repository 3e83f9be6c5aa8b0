//! Stdio JSON-RPC client for MCP servers.
//!
//! Spawns the server as a child process, performs the `initialize`
//! handshake, then exchanges newline-delimited JSON-RPC messages over
//! the child's stdin/stdout. Server logs pass through on stderr.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{RemoteToolInfo, ToolPage, ToolSource};
use crate::error::{BrainError, Result};
use crate::tools::{Tool, ToolArgs, ToolContext, ToolDescriptor};

const PROTOCOL_VERSION: &str = "2024-11-05";

struct Connection {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: i64,
    /// Set when a cancelled exchange may have left an unread response
    /// in the pipe. Responses are matched by read order, so the
    /// connection cannot be trusted afterwards.
    poisoned: bool,
}

impl Connection {
    fn next_request_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Send a JSON-RPC request and wait for the matching response line.
    async fn send_request(&mut self, request: Value) -> Result<Value> {
        if self.poisoned {
            return Err(BrainError::Backend(
                "MCP connection out of sync after a cancelled call".into(),
            ));
        }
        let line = format!("{}\n", serde_json::to_string(&request)?);
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let mut response_line = String::new();
        let read = self.stdout.read_line(&mut response_line).await?;
        if read == 0 {
            return Err(BrainError::Backend("MCP server closed its stdout".into()));
        }

        let response: Value = serde_json::from_str(response_line.trim())
            .map_err(|e| BrainError::Backend(format!("invalid JSON from MCP server: {}", e)))?;
        if let Some(err) = response.get("error") {
            return Err(BrainError::Backend(format!("MCP server error: {}", err)));
        }
        Ok(response)
    }

    /// Send a JSON-RPC notification (no response expected).
    async fn send_notification(&mut self, notification: Value) -> Result<()> {
        let line = format!("{}\n", serde_json::to_string(&notification)?);
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

/// A connection to one MCP server process.
pub struct McpClient {
    name: String,
    conn: Mutex<Connection>,
}

impl McpClient {
    /// Spawn an MCP server process and perform the initialize handshake.
    pub async fn spawn(command: &str, args: &[String]) -> Result<Self> {
        info!(command, "spawning MCP server");
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                BrainError::Backend(format!("failed to spawn MCP server {:?}: {}", command, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BrainError::Backend("MCP server stdin was not piped".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrainError::Backend("MCP server stdout was not piped".into()))?;

        let mut conn = Connection {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            next_id: 1,
            poisoned: false,
        };

        let id = conn.next_request_id();
        conn.send_request(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }
        }))
        .await?;
        conn.send_notification(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
            "params": {}
        }))
        .await?;

        info!(command, "MCP server connected");
        Ok(Self {
            name: command.to_string(),
            conn: Mutex::new(conn),
        })
    }

    /// Kill the server process.
    pub async fn shutdown(&self) {
        let mut conn = self.conn.lock().await;
        info!(name = %self.name, "shutting down MCP server");
        let _ = conn.child.kill().await;
    }
}

#[async_trait]
impl ToolSource for McpClient {
    async fn list_tools(&self, cursor: Option<&str>) -> Result<ToolPage> {
        let mut conn = self.conn.lock().await;
        let mut params = json!({});
        if let Some(cursor) = cursor {
            params["cursor"] = json!(cursor);
        }
        let id = conn.next_request_id();
        let response = conn
            .send_request(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/list",
                "params": params,
            }))
            .await?;

        Ok(parse_tool_page(&response))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut conn = self.conn.lock().await;
        let id = conn.next_request_id();
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {
                "name": name,
                "arguments": Value::Object(arguments.clone()),
            }
        });

        debug!(tool = name, "forwarding tool call to MCP server");
        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            response = conn.send_request(request) => Some(response),
        };
        let response = match outcome {
            // The request line may already be on the wire with its
            // response unread; no further exchange on this pipe can be
            // matched reliably.
            None => {
                conn.poisoned = true;
                return Err(BrainError::Cancelled);
            }
            Some(response) => response?,
        };

        Ok(extract_text_content(&response))
    }
}

/// Parse a `tools/list` response into a page of raw tool metadata.
fn parse_tool_page(response: &Value) -> ToolPage {
    let mut tools = Vec::new();
    if let Some(entries) = response
        .get("result")
        .and_then(|r| r.get("tools"))
        .and_then(|t| t.as_array())
    {
        for entry in entries {
            tools.push(RemoteToolInfo {
                name: entry
                    .get("name")
                    .and_then(|n| n.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                description: entry
                    .get("description")
                    .and_then(|d| d.as_str())
                    .unwrap_or_default()
                    .to_string(),
                input_schema: entry
                    .get("inputSchema")
                    .cloned()
                    .unwrap_or_else(|| json!({"type": "object"})),
            });
        }
    }
    let next_cursor = response
        .get("result")
        .and_then(|r| r.get("nextCursor"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(String::from);
    ToolPage { tools, next_cursor }
}

/// Flatten a `tools/call` result's content blocks into plain text.
fn extract_text_content(response: &Value) -> String {
    response
        .get("result")
        .and_then(|r| r.get("content"))
        .and_then(|c| c.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_else(|| {
            response
                .get("result")
                .map(|r| r.to_string())
                .unwrap_or_default()
        })
}

/// A discovered remote tool, registered alongside local tools.
///
/// Holds the translated descriptor and a shared handle to the client
/// that serves its invocations.
pub struct RemoteTool {
    descriptor: ToolDescriptor,
    client: Arc<McpClient>,
}

impl RemoteTool {
    pub fn new(descriptor: ToolDescriptor, client: Arc<McpClient>) -> Self {
        Self { descriptor, client }
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn descriptor(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn execute(&self, args: &ToolArgs, ctx: &ToolContext) -> Result<String> {
        let mut arguments = Map::new();
        for required in &self.descriptor.parameters.required {
            if args.get(required).is_none() {
                return Err(BrainError::InvalidArgs(format!(
                    "`{}` not provided",
                    required
                )));
            }
        }
        for name in self.descriptor.parameters.properties.keys() {
            if let Some(value) = args.get(name) {
                arguments.insert(name.clone(), value.clone());
            }
        }
        self.client
            .call_tool(&self.descriptor.name, &arguments, &ctx.cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_page() {
        let response = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {
                "tools": [
                    {
                        "name": "read_notes",
                        "description": "Read stored notes",
                        "inputSchema": {"type": "object", "properties": {}}
                    },
                    {"name": "bare"}
                ],
                "nextCursor": "page-2"
            }
        });
        let page = parse_tool_page(&response);
        assert_eq!(page.tools.len(), 2);
        assert_eq!(page.tools[0].name, "read_notes");
        assert_eq!(page.tools[0].description, "Read stored notes");
        assert_eq!(page.tools[1].input_schema, json!({"type": "object"}));
        assert_eq!(page.next_cursor.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_parse_tool_page_empty_cursor_means_done() {
        let response = json!({
            "result": {"tools": [], "nextCursor": ""}
        });
        let page = parse_tool_page(&response);
        assert!(page.tools.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_extract_text_content_joins_blocks() {
        let response = json!({
            "result": {
                "content": [
                    {"type": "text", "text": "line one"},
                    {"type": "text", "text": "line two"},
                    {"type": "image", "data": "..."}
                ]
            }
        });
        assert_eq!(extract_text_content(&response), "line one\nline two");
    }

    #[test]
    fn test_extract_text_content_falls_back_to_raw_result() {
        let response = json!({"result": {"ok": true}});
        assert_eq!(extract_text_content(&response), "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_cancelled_call_poisons_the_connection() {
        // Echoes the handshake request back as its response, swallows
        // the initialized notification, then goes silent.
        let script = r#"read -r line; printf '%s\n' "$line"; read -r _; exec sleep 60"#;
        let client = McpClient::spawn("sh", &["-c".to_string(), script.to_string()])
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = client
            .call_tool("lookup", &Map::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BrainError::Cancelled));

        // The request went out but its response was never read; further
        // exchanges on this pipe must refuse to run.
        let err = client.list_tools(None).await.unwrap_err();
        assert!(matches!(err, BrainError::Backend(_)));
        assert!(err.to_string().contains("out of sync"));

        client.shutdown().await;
    }
}
