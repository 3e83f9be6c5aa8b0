//! Model backend clients.
//!
//! A [`ChatBackend`] turns the full conversation history plus the
//! current tool descriptor list into exactly one assistant message.
//! Requests are always single-shot: the backend must return one
//! complete message, never partial deltas the loop would have to
//! reassemble.

mod ollama;

pub use ollama::OllamaBackend;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::history::Message;
use crate::tools::ToolDescriptor;

/// One chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolDescriptor],
}

/// Synchronous request/response channel to the model.
///
/// Errors propagate unchanged and are fatal to the current step;
/// cancelling the token aborts the in-flight call with
/// [`BrainError::Cancelled`](crate::BrainError::Cancelled) and no
/// message is produced.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: ChatRequest<'_>, cancel: &CancellationToken) -> Result<Message>;
}
