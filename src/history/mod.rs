//! Conversation history - message types and the append-only transcript
//!
//! One conversation is an ordered sequence of [`Message`]s owned
//! exclusively by the agent loop. Messages are only ever appended; no
//! message is edited or removed during normal operation.
//!
//! Roles form a small open set: the three conversational roles plus a
//! tool's own name used as a pseudo-role on tool-result messages. The
//! tool name there is a provenance tag, not a true conversational role.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Role tag on a message.
///
/// Serializes to the plain role string (`"system"`, `"user"`,
/// `"assistant"`, or the tool name for tool results) so the type maps
/// directly onto chat wire formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    /// Tool-result pseudo-role carrying the originating tool's name.
    Tool(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool(name) => name,
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => Role::Tool(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Err(de::Error::custom("role cannot be empty"));
        }
        Ok(Role::from_str(&s))
    }
}

/// A structured tool invocation requested by the model.
///
/// Created by the model backend inside an assistant message, consumed
/// exactly once by the agent loop, which resolves it to a registered
/// tool and produces exactly one corresponding result message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the target tool.
    pub name: String,
    /// Untyped arguments: parameter name to JSON value.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// One turn in the conversation.
///
/// A message either carries tool-call requests or has non-empty content.
/// This is not strictly enforced: an assistant message with neither
/// indicates an anomalous backend response, which the loop tolerates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Reasoning trace surfaced by the backend, when supported. Shown
    /// alongside the content; never parsed further by the loop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Tool invocations requested by the model, in emitted order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            thinking: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            thinking: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            thinking: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            thinking: None,
            tool_calls,
        }
    }

    /// Result message for one tool invocation, tagged with the tool's
    /// own name as pseudo-role.
    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool(tool_name.into()),
            content: content.into(),
            thinking: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self.role, Role::Tool(_))
    }

    /// Flatten the message into displayable text.
    ///
    /// Tool-call requests are serialized into fenced JSON blocks so the
    /// transcript shows them distinct from plain content. A reasoning
    /// trace, when present, renders as a quoted block above the content.
    pub fn display_content(&self) -> String {
        if self.has_tool_calls() {
            return self
                .tool_calls
                .iter()
                .filter_map(|call| {
                    serde_json::to_string_pretty(call)
                        .ok()
                        .map(|json| format!("```json\n{}\n```", json))
                })
                .collect::<Vec<_>>()
                .join("\n\n");
        }
        match &self.thinking {
            Some(thinking) if !thinking.is_empty() => {
                let quoted = thinking
                    .lines()
                    .map(|l| format!("> {}", l))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{}\n\n{}", quoted, self.content)
            }
            _ => self.content.clone(),
        }
    }
}

/// Append-only ordered sequence of messages.
///
/// Owned exclusively by one agent loop instance; the only mutation is
/// [`push`](History::push). The turn limit lives in the loop, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Render the whole transcript as markdown: one `# role` heading per
    /// message (tool results are thereby labeled with the originating
    /// tool's name), followed by the flattened content.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            out.push_str("# ");
            out.push_str(message.role.as_str());
            out.push('\n');
            out.push_str(&message.display_content());
            out.push_str("\n\n");
        }
        out
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_role_round_trip() {
        for role in [
            Role::System,
            Role::User,
            Role::Assistant,
            Role::Tool("web_search".into()),
        ] {
            let json = serde_json::to_string(&role).unwrap();
            let back: Role = serde_json::from_str(&json).unwrap();
            assert_eq!(back, role);
        }
    }

    #[test]
    fn test_tool_name_becomes_pseudo_role() {
        let role: Role = serde_json::from_str("\"weather\"").unwrap();
        assert_eq!(role, Role::Tool("weather".into()));
        assert_eq!(role.as_str(), "weather");
    }

    #[test]
    fn test_empty_role_rejected() {
        let result: std::result::Result<Role, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("be helpful").role, Role::System);
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::assistant("hello").role, Role::Assistant);

        let result = Message::tool_result("weather", "Sunny, 22C");
        assert_eq!(result.role, Role::Tool("weather".into()));
        assert!(result.is_tool_result());
        assert_eq!(result.content, "Sunny, 22C");
    }

    #[test]
    fn test_display_plain_content() {
        let msg = Message::assistant("just text");
        assert_eq!(msg.display_content(), "just text");
    }

    #[test]
    fn test_display_tool_calls_as_json_blocks() {
        let msg = Message::assistant_with_tools(
            "",
            vec![
                ToolCall::new("web_search", args(&[("query", json!("rust async"))])),
                ToolCall::new("weather", args(&[("location", json!("Lisbon"))])),
            ],
        );
        let shown = msg.display_content();
        assert!(shown.contains("```json"));
        assert!(shown.contains("web_search"));
        assert!(shown.contains("rust async"));
        assert!(shown.contains("weather"));
        // Two fenced blocks, one per request.
        assert_eq!(shown.matches("```json").count(), 2);
    }

    #[test]
    fn test_display_thinking_quoted() {
        let mut msg = Message::assistant("final answer");
        msg.thinking = Some("step one\nstep two".into());
        let shown = msg.display_content();
        assert!(shown.contains("> step one"));
        assert!(shown.contains("> step two"));
        assert!(shown.ends_with("final answer"));
    }

    #[test]
    fn test_history_append_only_ordering() {
        let mut history = History::new();
        history.push(Message::system("sys"));
        history.push(Message::user("hi"));
        history.push(Message::assistant("hello"));

        assert_eq!(history.len(), 3);
        assert_eq!(history.last().unwrap().role, Role::Assistant);
        let roles: Vec<&str> = history.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
    }

    #[test]
    fn test_transcript_labels_tool_results() {
        let mut history = History::new();
        history.push(Message::user("weather in Lisbon?"));
        history.push(Message::tool_result("weather", "Sunny, 22C"));

        let md = history.to_markdown();
        assert!(md.contains("# user"));
        assert!(md.contains("# weather"));
        assert!(md.contains("Sunny, 22C"));
    }

    #[test]
    fn test_message_serde_round_trip() {
        let msg = Message::assistant_with_tools(
            "calling",
            vec![ToolCall::new("weather", args(&[("location", json!("Oslo"))]))],
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_plain_message_omits_tool_calls_field() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("thinking").is_none());
    }
}
