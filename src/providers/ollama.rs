//! Ollama chat backend.
//!
//! Speaks `POST {host}/api/chat`. Every request disables streaming and
//! asks the model to surface its reasoning (`think: true`); a returned
//! `thinking` field maps onto [`Message::thinking`] and is treated as
//! display content only.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ChatBackend, ChatRequest};
use crate::error::{BrainError, Result};
use crate::history::{Message, Role, ToolCall};
use crate::tools::ToolDescriptor;

/// Client for an Ollama-style chat endpoint.
pub struct OllamaBackend {
    client: Client,
    host: String,
}

impl OllamaBackend {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    async fn chat(&self, request: ChatRequest<'_>, cancel: &CancellationToken) -> Result<Message> {
        if cancel.is_cancelled() {
            return Err(BrainError::Cancelled);
        }
        let url = format!("{}/api/chat", self.host);
        let body = WireRequest::from_chat_request(&request);
        debug!(model = request.model, messages = request.messages.len(), "requesting chat completion");

        // The whole exchange races the token, so cancellation mid-body
        // aborts too, not just cancellation before the headers arrive.
        let fetch = async {
            let response = self.client.post(&url).json(&body).send().await?;
            Ok::<WireResponse, BrainError>(response.error_for_status()?.json().await?)
        };
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(BrainError::Cancelled),
            response = fetch => response?,
        };

        Ok(response.message.into_message())
    }
}

// ---------------------------------------------------------------------------
// Wire types (Ollama /api/chat)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    tools: Vec<WireTool<'a>>,
    think: bool,
    stream: bool,
}

impl<'a> WireRequest<'a> {
    fn from_chat_request(request: &ChatRequest<'a>) -> Self {
        Self {
            model: request.model,
            messages: request.messages.iter().map(WireMessage::from_message).collect(),
            tools: request
                .tools
                .iter()
                .map(|descriptor| WireTool {
                    kind: "function",
                    function: descriptor,
                })
                .collect(),
            think: true,
            stream: false,
        }
    }
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDescriptor,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

impl WireMessage {
    fn from_message(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            thinking: message.thinking.clone(),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
        }
    }

    fn into_message(self) -> Message {
        // Role defaults to assistant for anomalous empty-role responses.
        let role = if self.role.is_empty() {
            Role::Assistant
        } else {
            serde_json::from_value(Value::String(self.role)).unwrap_or(Role::Assistant)
        };
        Message {
            role,
            content: self.content,
            thinking: self.thinking,
            tool_calls: self
                .tool_calls
                .into_iter()
                .map(|call| ToolCall::new(call.function.name, call.function.arguments))
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

#[derive(Deserialize)]
struct WireResponse {
    message: WireMessage,
}
