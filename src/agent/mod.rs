//! Agent module - the conversation control loop
//!
//! The agent loop advances a conversation one step at a time. At every
//! iteration it inspects the latest history entry and branches into
//! exactly one of:
//!
//! - **tool execution** - the latest message carries tool-call requests:
//!   each one is resolved and invoked in emitted order, strictly
//!   sequentially, and one result message per request is appended in
//!   that same order;
//! - **model response** - otherwise: the full history plus the current
//!   tool descriptor list goes to the backend, and exactly the one
//!   returned assistant message is appended.
//!
//! Soliciting user input is never part of the stepping function; the
//! outer [`AgentLoop::run`] driver prompts whenever the latest message
//! is a plain assistant reply. The driver stops once the history grows
//! past the configured turn limit; a limit of `0` means run forever
//! (there is deliberately no content-based stop condition — termination
//! is length, operator interrupt, or an error).
//!
//! Failures are never recovered into synthetic transcript turns: any
//! error aborts the step, leaves the history exactly as it was, and
//! propagates to the caller.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{BrainError, Result};
use crate::history::{History, Message, Role, ToolCall};
use crate::providers::{ChatBackend, ChatRequest};
use crate::tools::{ToolContext, ToolRegistry};

/// Boundary supplying the next user message as plain text.
///
/// Empty input is a validation error, not a valid turn; interactive
/// implementations are expected to re-prompt rather than return an
/// empty string.
#[async_trait]
pub trait PromptSource: Send {
    async fn next_prompt(&mut self, history: &History) -> Result<String>;
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Tool calls were executed; carries the number of result messages appended.
    ToolsExecuted(usize),
    /// The backend produced one assistant message.
    AssistantReplied,
}

/// The conversation state machine.
///
/// Exclusively owns its history and registry. The registry is populated
/// during setup and read-only for the loop's lifetime; the history only
/// ever grows.
pub struct AgentLoop {
    model: String,
    limit: usize,
    backend: Box<dyn ChatBackend>,
    registry: ToolRegistry,
    history: History,
}

impl AgentLoop {
    /// Create a loop over an empty history.
    ///
    /// `limit` bounds the history length; `0` means unbounded.
    pub fn new(
        model: impl Into<String>,
        limit: usize,
        backend: Box<dyn ChatBackend>,
        registry: ToolRegistry,
    ) -> Self {
        Self {
            model: model.into(),
            limit,
            backend,
            registry,
            history: History::new(),
        }
    }

    /// Seed the history with exactly one system and one user message.
    pub fn seed(&mut self, system: impl Into<String>, prompt: impl Into<String>) {
        self.history.push(Message::system(system));
        self.history.push(Message::user(prompt));
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Advance the conversation by one step.
    ///
    /// Branches on the latest message only; never solicits user input.
    #[instrument(skip_all, fields(history_len = self.history.len()))]
    pub async fn step(&mut self, cancel: &CancellationToken) -> Result<Step> {
        let latest = self
            .history
            .last()
            .ok_or_else(|| BrainError::InvalidInput("history is empty; seed it first".into()))?;

        if latest.has_tool_calls() {
            let calls = latest.tool_calls.clone();
            self.execute_tools(&calls, cancel).await
        } else {
            self.request_completion(cancel).await
        }
    }

    /// Execute a batch of tool calls atomically.
    ///
    /// All names are resolved before anything runs, the calls execute
    /// strictly sequentially in emitted order, and the result messages
    /// are appended only after every call has succeeded. A failure
    /// anywhere aborts the step with the history untouched.
    async fn execute_tools(
        &mut self,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> Result<Step> {
        for call in calls {
            if !self.registry.contains(&call.name) {
                return Err(BrainError::UnknownTool(call.name.clone()));
            }
        }

        let ctx = ToolContext::new(cancel.clone());
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            debug!(tool = %call.name, "invoking tool");
            results.push(self.registry.invoke(call, &ctx).await?);
        }
        let count = results.len();
        for result in results {
            self.history.push(result);
        }
        info!(count, "tool batch complete");
        Ok(Step::ToolsExecuted(count))
    }

    /// Request one assistant message from the backend and append it.
    async fn request_completion(&mut self, cancel: &CancellationToken) -> Result<Step> {
        let descriptors = self.registry.descriptors();
        let request = ChatRequest {
            model: &self.model,
            messages: self.history.as_slice(),
            tools: &descriptors,
        };
        let message = self.backend.chat(request, cancel).await?;
        debug!(
            tool_calls = message.tool_calls.len(),
            "assistant message received"
        );
        self.history.push(message);
        Ok(Step::AssistantReplied)
    }

    /// Outer driver loop.
    ///
    /// Prompts for user input whenever the latest message is a plain
    /// assistant reply, and steps otherwise, until the history grows
    /// past the limit. With `limit == 0` this runs until cancellation
    /// or an error.
    pub async fn run(
        &mut self,
        prompts: &mut dyn PromptSource,
        cancel: &CancellationToken,
    ) -> Result<()> {
        while self.limit == 0 || self.history.len() <= self.limit {
            let latest = self.history.last().ok_or_else(|| {
                BrainError::InvalidInput("history is empty; seed it first".into())
            })?;

            if !latest.has_tool_calls() && latest.role == Role::Assistant {
                let content = prompts.next_prompt(&self.history).await?;
                if content.trim().is_empty() {
                    return Err(BrainError::InvalidInput("prompt cannot be empty".into()));
                }
                self.history.push(Message::user(content));
            } else {
                self.step(cancel).await?;
            }
        }
        info!(limit = self.limit, len = self.history.len(), "turn limit reached");
        Ok(())
    }
}
