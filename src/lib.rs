//! Minibrain - an interactive terminal chat agent with tool calling
//!
//! Minibrain mediates between a human operator, an Ollama-style LLM
//! backend, and a set of callable tools. The model may request tool
//! invocations (web search, weather lookup, or capabilities discovered
//! from MCP servers); the agent loop executes them and feeds the results
//! back until the model produces a plain reply for the operator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌──────────────┐
//! │ PromptSource │────>│  AgentLoop  │────>│ ChatBackend  │
//! │  (terminal)  │     │             │     │   (Ollama)   │
//! └──────────────┘     └─────────────┘     └──────────────┘
//!                             │
//!                             ▼
//!                      ┌─────────────┐     ┌──────────────┐
//!                      │    Tool     │────>│  MCP client  │
//!                      │  Registry   │     │  (optional)  │
//!                      └─────────────┘     └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use minibrain::agent::AgentLoop;
//! use minibrain::providers::OllamaBackend;
//! use minibrain::tools::{ToolRegistry, WeatherTool};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run() {
//!     let mut registry = ToolRegistry::new();
//!     registry.add(vec![Box::new(WeatherTool::new())]).unwrap();
//!
//!     let backend = OllamaBackend::new("http://localhost:11434");
//!     let mut agent = AgentLoop::new("qwen3", 0, Box::new(backend), registry);
//!     agent.seed("You are a helpful assistant.", "What's the weather in Lisbon?");
//!
//!     let cancel = CancellationToken::new();
//!     agent.step(&cancel).await.unwrap();
//! }
//! ```

pub mod agent;
pub mod error;
pub mod history;
pub mod mcp;
pub mod providers;
pub mod tools;

pub use error::{BrainError, Result};
