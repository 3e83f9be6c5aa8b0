//! Tools module - capability contract, descriptors, and registry
//!
//! A tool is a named, independently executable capability the model may
//! request. Tools vary in behavior but share one contract: describe
//! yourself (a [`ToolDescriptor`] shown to the model) and run with a set
//! of untyped arguments. Local tools (web search, weather) and tools
//! discovered from MCP servers all register through the same
//! [`ToolRegistry`].
//!
//! # Example
//!
//! ```
//! use minibrain::tools::{Tool, ToolRegistry, SearchTool, WeatherTool};
//!
//! let mut registry = ToolRegistry::new();
//! registry
//!     .add(vec![
//!         Box::new(SearchTool::new()) as Box<dyn Tool>,
//!         Box::new(WeatherTool::new()),
//!     ])
//!     .unwrap();
//! assert_eq!(registry.descriptors().len(), 2);
//! ```

mod registry;
pub mod search;
pub mod weather;

pub use registry::ToolRegistry;
pub use search::SearchTool;
pub use weather::WeatherTool;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{BrainError, Result};

/// Normalized schema describing one callable capability.
///
/// This is the single uniform shape handed to the model backend,
/// regardless of whether the tool is defined locally or translated from
/// a remote provider's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique within a registry.
    pub name: String,
    /// Natural-language description shown to the model.
    pub description: String,
    pub parameters: Parameters,
}

impl ToolDescriptor {
    /// Check the descriptor's internal invariant: every required
    /// parameter name must exist in `properties`.
    pub fn validate(&self) -> Result<()> {
        for required in &self.parameters.required {
            if !self.parameters.properties.contains_key(required) {
                return Err(BrainError::Schema(format!(
                    "tool {:?}: required parameter {:?} is not declared in properties",
                    self.name, required
                )));
            }
        }
        Ok(())
    }
}

/// JSON-Schema-like parameter shape of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Property>,
}

impl Parameters {
    /// An `object` parameter shape with no properties.
    pub fn object() -> Self {
        Self {
            kind: "object".to_string(),
            required: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::object()
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    /// Allowed string values, when constrained. Empty means unconstrained.
    #[serde(
        rename = "enum",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub allowed: Vec<String>,
}

impl Property {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            kind: "string".to_string(),
            description: description.into(),
            allowed: Vec::new(),
        }
    }

    pub fn string_enum(description: impl Into<String>, allowed: &[&str]) -> Self {
        Self {
            kind: "string".to_string(),
            description: description.into(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Untyped tool arguments with typed extraction helpers.
///
/// Arguments arrive from the model as a mapping from parameter name to a
/// JSON value. Each tool validates its own required arguments through
/// these helpers; failures name the offending parameter.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Required string argument.
    pub fn require_str(&self, name: &str) -> Result<&str> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| BrainError::InvalidArgs(format!("`{}` not provided", name)))?;
        value.as_str().ok_or_else(|| {
            BrainError::InvalidArgs(format!("`{}` expects a string, but got {}", name, value))
        })
    }

    /// Optional string argument; `None` when absent, error when mistyped.
    pub fn opt_str(&self, name: &str) -> Result<Option<&str>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(value) => value.as_str().map(Some).ok_or_else(|| {
                BrainError::InvalidArgs(format!("`{}` expects a string, but got {}", name, value))
            }),
        }
    }

    /// Optional string argument constrained to a set of allowed values.
    pub fn opt_enum(&self, name: &str, allowed: &[&str]) -> Result<Option<&str>> {
        match self.opt_str(name)? {
            None => Ok(None),
            Some(value) if allowed.contains(&value) => Ok(Some(value)),
            Some(value) => Err(BrainError::InvalidArgs(format!(
                "`{}` must be one of {:?}, but got {:?}",
                name, allowed, value
            ))),
        }
    }

    /// Optional unsigned integer argument.
    pub fn opt_u64(&self, name: &str) -> Result<Option<u64>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                BrainError::InvalidArgs(format!(
                    "`{}` expects an unsigned integer, but got {}",
                    name, value
                ))
            }),
        }
    }
}

impl From<Map<String, Value>> for ToolArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Execution context threaded through every tool invocation.
///
/// Carries the shared cancellation token from the outer loop. The
/// registry passes it through unchanged; timeout and retry decisions
/// belong to the individual tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
        }
    }
}

/// Shared contract for all tools: describe + run.
///
/// Implementations are held in the registry as boxed trait objects; the
/// registry exclusively owns each tool instance for the process lifetime.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The normalized schema shown to the model.
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute with the given arguments, returning textual output.
    ///
    /// Side effects are tool-specific and may include outbound network
    /// calls; implementations should honor `ctx.cancel`.
    async fn execute(&self, args: &ToolArgs, ctx: &ToolContext) -> Result<String>;
}
