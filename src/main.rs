//! Minibrain binary entry point.
//!
//! The binary is the outer driver: it parses the CLI, initializes
//! logging, constructs and populates the tool registry (built-ins plus
//! tools discovered from MCP servers), seeds the agent loop, and runs
//! it against a terminal prompt source. It is also the only layer that
//! translates core errors into human-facing output.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use minibrain::agent::{AgentLoop, PromptSource};
use minibrain::history::History;
use minibrain::mcp::{discover, McpClient, RemoteTool};
use minibrain::providers::OllamaBackend;
use minibrain::tools::{SearchTool, Tool, ToolRegistry, WeatherTool};
use minibrain::BrainError;

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Use the available tools when they help answer the question.";

/// Interactive terminal chat agent with tool calling.
#[derive(Parser, Debug)]
#[command(name = "minibrain", version, about)]
struct Cli {
    /// Model to chat with
    #[arg(long, default_value = "qwen3")]
    model: String,

    /// Ollama host (falls back to $OLLAMA_HOST)
    #[arg(long)]
    host: Option<String>,

    /// History length limit; 0 means run forever
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// System prompt for the conversation
    #[arg(long)]
    system: Option<String>,

    /// Initial user prompt (asked interactively when omitted)
    prompt: Option<String>,

    /// MCP server command line to spawn, e.g. "npx some-mcp-server"; repeatable
    #[arg(long = "mcp")]
    mcp_servers: Vec<String>,

    /// Skip registering the built-in web_search and weather tools
    #[arg(long)]
    no_builtins: bool,
}

/// Terminal prompt source backed by rustyline.
///
/// Prints transcript entries the operator has not seen yet before each
/// prompt, and re-prompts until the input is non-empty. Ctrl-C and
/// Ctrl-D surface as cancellation.
struct ReadlinePrompt {
    editor: Option<DefaultEditor>,
    seen: usize,
}

impl ReadlinePrompt {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            editor: Some(DefaultEditor::new()?),
            seen: 0,
        })
    }

    /// Mark the first `len` history entries as already shown.
    fn skip_to(&mut self, len: usize) {
        self.seen = len;
    }

    fn show_unseen(&mut self, history: &History) {
        for message in history.as_slice().iter().skip(self.seen) {
            println!("# {}\n{}\n", message.role, message.display_content());
        }
        self.seen = history.len();
    }

    async fn read_line(&mut self) -> minibrain::Result<String> {
        let mut editor = self
            .editor
            .take()
            .ok_or_else(|| BrainError::InvalidInput("prompt editor unavailable".into()))?;
        // rustyline is blocking; run it off the async runtime.
        let (editor, result) = tokio::task::spawn_blocking(move || {
            let result = loop {
                match editor.readline("you> ") {
                    Ok(line) if line.trim().is_empty() => {
                        eprintln!("prompt cannot be empty");
                        continue;
                    }
                    Ok(line) => {
                        let _ = editor.add_history_entry(&line);
                        break Ok(line);
                    }
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                        break Err(BrainError::Cancelled);
                    }
                    Err(e) => break Err(BrainError::InvalidInput(e.to_string())),
                }
            };
            (editor, result)
        })
        .await
        .map_err(|e| BrainError::InvalidInput(format!("prompt task failed: {}", e)))?;
        self.editor = Some(editor);
        result
    }
}

#[async_trait]
impl PromptSource for ReadlinePrompt {
    async fn next_prompt(&mut self, history: &History) -> minibrain::Result<String> {
        self.show_unseen(history);
        self.read_line().await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let host = cli
        .host
        .or_else(|| std::env::var("OLLAMA_HOST").ok())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let mut registry = ToolRegistry::new();
    if !cli.no_builtins {
        registry
            .add(vec![
                Box::new(SearchTool::new()) as Box<dyn Tool>,
                Box::new(WeatherTool::new()),
            ])
            .context("failed to register built-in tools")?;
    }

    let mut mcp_clients = Vec::new();
    for server in &cli.mcp_servers {
        let mut parts = server.split_whitespace();
        let command = parts
            .next()
            .context("--mcp requires a non-empty command line")?;
        let args: Vec<String> = parts.map(String::from).collect();

        let client = Arc::new(
            McpClient::spawn(command, &args)
                .await
                .with_context(|| format!("failed to start MCP server {:?}", server))?,
        );
        let descriptors = discover(client.as_ref())
            .await
            .with_context(|| format!("failed to discover tools from {:?}", server))?;
        info!(server, tools = descriptors.len(), "MCP tools discovered");

        let remote_tools: Vec<Box<dyn Tool>> = descriptors
            .into_iter()
            .map(|descriptor| {
                Box::new(RemoteTool::new(descriptor, client.clone())) as Box<dyn Tool>
            })
            .collect();
        registry
            .add(remote_tools)
            .with_context(|| format!("failed to register tools from {:?}", server))?;
        mcp_clients.push(client);
    }

    let mut prompts = ReadlinePrompt::new()?;
    let prompt = match cli.prompt {
        Some(prompt) if !prompt.trim().is_empty() => prompt,
        _ => prompts.read_line().await.map_err(anyhow::Error::from)?,
    };
    let system = cli
        .system
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    let backend = OllamaBackend::new(host);
    let mut agent = AgentLoop::new(cli.model, cli.limit, Box::new(backend), registry);
    agent.seed(system, prompt);
    prompts.skip_to(agent.history().len());

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            canceller.cancel();
        }
    });

    let outcome = agent.run(&mut prompts, &cancel).await;

    // Full transcript on the way out, whatever happened.
    println!("{}", agent.history().to_markdown());
    for client in &mcp_clients {
        client.shutdown().await;
    }

    match outcome {
        Ok(()) => Ok(()),
        Err(BrainError::Cancelled) => {
            eprintln!("session cancelled");
            Ok(())
        }
        Err(e) => Err(e).context("session ended with an error"),
    }
}
