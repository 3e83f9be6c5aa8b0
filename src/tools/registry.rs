//! Tool registry - unique-name ownership of tool implementations
//!
//! The registry maps tool names to boxed implementations. It is mutated
//! only during setup via [`ToolRegistry::add`] and read (listed,
//! invoked) for the lifetime of the agent loop that owns it. There is no
//! process-wide default registry; every loop constructs its own.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{Tool, ToolArgs, ToolContext, ToolDescriptor};
use crate::error::{BrainError, Result};
use crate::history::{Message, ToolCall};

/// Registry for tools the model may invoke.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a batch of tools atomically.
    ///
    /// Names are derived from each tool's descriptor and checked against
    /// existing entries and against the rest of the batch before any
    /// insertion happens. A duplicate name or an invalid descriptor
    /// fails the whole batch and leaves the registry unchanged.
    pub fn add(&mut self, tools: Vec<Box<dyn Tool>>) -> Result<()> {
        let mut incoming: Vec<(String, Box<dyn Tool>)> = Vec::with_capacity(tools.len());
        for tool in tools {
            let descriptor = tool.descriptor();
            descriptor.validate()?;
            let name = descriptor.name;
            if self.tools.contains_key(&name) || incoming.iter().any(|(n, _)| n == &name) {
                warn!(tool = %name, "rejecting duplicate tool registration");
                return Err(BrainError::DuplicateTool(name));
            }
            incoming.push((name, tool));
        }
        for (name, tool) in incoming {
            debug!(tool = %name, "registered tool");
            self.tools.insert(name, tool);
        }
        Ok(())
    }

    /// All descriptors, in unspecified order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|tool| tool.descriptor()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve and execute one tool-call request.
    ///
    /// Fails with [`BrainError::UnknownTool`] when the name is not
    /// registered; otherwise delegates to the tool's own execution
    /// contract with the cancellation context threaded through
    /// unchanged. The textual output is wrapped into a result message
    /// whose role is the tool's own name.
    pub async fn invoke(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Message> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| BrainError::UnknownTool(call.name.clone()))?;
        let args = ToolArgs::new(call.arguments.clone());
        let output = tool.execute(&args, ctx).await?;
        Ok(Message::tool_result(call.name.clone(), output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Map};

    use crate::history::Role;
    use crate::tools::{Parameters, Property};

    /// Minimal echo tool for registry tests.
    struct EchoTool {
        name: String,
    }

    impl EchoTool {
        fn boxed(name: &str) -> Box<dyn Tool> {
            Box::new(Self {
                name: name.to_string(),
            })
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: self.name.clone(),
                description: "Echo the value argument".into(),
                parameters: Parameters {
                    kind: "object".into(),
                    required: vec!["value".into()],
                    properties: [("value".to_string(), Property::string("value to echo"))]
                        .into_iter()
                        .collect(),
                },
            }
        }

        async fn execute(&self, args: &ToolArgs, _ctx: &ToolContext) -> crate::Result<String> {
            Ok(format!("{}:{}", self.name, args.require_str("value")?))
        }
    }

    fn call(name: &str, value: &str) -> ToolCall {
        let mut args = Map::new();
        args.insert("value".into(), json!(value));
        ToolCall::new(name, args)
    }

    #[test]
    fn test_add_distinct_names() {
        let mut registry = ToolRegistry::new();
        registry
            .add(vec![EchoTool::boxed("alpha"), EchoTool::boxed("beta")])
            .unwrap();

        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 2);
        let mut names: Vec<String> = descriptors.into_iter().map(|d| d.name).collect();
        names.sort();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_add_duplicate_against_existing_fails() {
        let mut registry = ToolRegistry::new();
        registry.add(vec![EchoTool::boxed("alpha")]).unwrap();

        let err = registry.add(vec![EchoTool::boxed("alpha")]).unwrap_err();
        assert!(matches!(err, BrainError::DuplicateTool(ref n) if n == "alpha"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_batch_is_atomic() {
        let mut registry = ToolRegistry::new();
        registry.add(vec![EchoTool::boxed("existing")]).unwrap();

        // "fresh" precedes the collision in the batch but must not land.
        let err = registry
            .add(vec![EchoTool::boxed("fresh"), EchoTool::boxed("existing")])
            .unwrap_err();
        assert!(matches!(err, BrainError::DuplicateTool(_)));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("fresh"));
    }

    #[test]
    fn test_add_duplicate_within_batch_fails() {
        let mut registry = ToolRegistry::new();
        let err = registry
            .add(vec![EchoTool::boxed("twin"), EchoTool::boxed("twin")])
            .unwrap_err();
        assert!(matches!(err, BrainError::DuplicateTool(ref n) if n == "twin"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_wraps_output_with_tool_role() {
        let mut registry = ToolRegistry::new();
        registry.add(vec![EchoTool::boxed("echo")]).unwrap();

        let message = registry
            .invoke(&call("echo", "hello"), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(message.role, Role::Tool("echo".into()));
        assert_eq!(message.content, "echo:hello");
        assert!(message.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .invoke(&call("nonexistent", "x"), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BrainError::UnknownTool(ref n) if n == "nonexistent"));
    }

    #[tokio::test]
    async fn test_invoke_propagates_argument_error() {
        let mut registry = ToolRegistry::new();
        registry.add(vec![EchoTool::boxed("echo")]).unwrap();

        let err = registry
            .invoke(&ToolCall::new("echo", Map::new()), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BrainError::InvalidArgs(_)));
        assert!(err.to_string().contains("`value` not provided"));
    }
}
