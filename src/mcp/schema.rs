//! Schema translation from remote provider metadata to tool descriptors.

use std::collections::BTreeMap;

use tracing::debug;

use super::{RemoteToolInfo, ToolSource};
use crate::error::{BrainError, Result};
use crate::tools::{Parameters, Property, ToolDescriptor};

/// Translate one remote tool's metadata into the uniform descriptor shape.
///
/// Every parameter's enum entries must be strings; any other value fails
/// the whole translation with a schema-violation error naming the
/// offending value, and no partial descriptor is returned. An absent or
/// empty enum list is fine.
pub fn translate(info: &RemoteToolInfo) -> Result<ToolDescriptor> {
    let schema = &info.input_schema;
    let kind = schema
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("object")
        .to_string();

    let required = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let mut properties = BTreeMap::new();
    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (name, param) in props {
            let mut allowed = Vec::new();
            if let Some(entries) = param.get("enum").and_then(|e| e.as_array()) {
                for entry in entries {
                    let Some(value) = entry.as_str() else {
                        return Err(BrainError::Schema(format!(
                            "tool {:?}, parameter {:?}: enum must be string, but got {}",
                            info.name, name, entry
                        )));
                    };
                    allowed.push(value.to_string());
                }
            }
            properties.insert(
                name.clone(),
                Property {
                    kind: param
                        .get("type")
                        .and_then(|t| t.as_str())
                        .unwrap_or("string")
                        .to_string(),
                    description: param
                        .get("description")
                        .and_then(|d| d.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    allowed,
                },
            );
        }
    }

    let descriptor = ToolDescriptor {
        name: info.name.clone(),
        description: info.description.clone(),
        parameters: Parameters {
            kind,
            required,
            properties,
        },
    };
    descriptor.validate()?;
    Ok(descriptor)
}

/// Discover all tools from a provider, following pagination.
///
/// Accumulates translated descriptors in page order. Any page-fetch or
/// translation error propagates immediately; there is no retry and no
/// partial result.
pub async fn discover<S: ToolSource + ?Sized>(source: &S) -> Result<Vec<ToolDescriptor>> {
    let mut descriptors = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = source.list_tools(cursor.as_deref()).await?;
        for info in &page.tools {
            descriptors.push(translate(info)?);
        }
        match page.next_cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => break,
        }
    }
    debug!(count = descriptors.len(), "discovered remote tools");
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::ToolPage;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use tokio_util::sync::CancellationToken;

    fn info(name: &str, schema: Value) -> RemoteToolInfo {
        RemoteToolInfo {
            name: name.into(),
            description: format!("{} tool", name),
            input_schema: schema,
        }
    }

    #[test]
    fn test_translate_basic_schema() {
        let descriptor = translate(&info(
            "lookup",
            json!({
                "type": "object",
                "required": ["key"],
                "properties": {
                    "key": {"type": "string", "description": "key to look up"}
                }
            }),
        ))
        .unwrap();

        assert_eq!(descriptor.name, "lookup");
        assert_eq!(descriptor.parameters.kind, "object");
        assert_eq!(descriptor.parameters.required, vec!["key"]);
        let key = &descriptor.parameters.properties["key"];
        assert_eq!(key.kind, "string");
        assert_eq!(key.description, "key to look up");
        assert!(key.allowed.is_empty());
    }

    #[test]
    fn test_translate_string_enum() {
        let descriptor = translate(&info(
            "mode_tool",
            json!({
                "type": "object",
                "properties": {
                    "mode": {"type": "string", "enum": ["fast", "slow"]}
                }
            }),
        ))
        .unwrap();
        assert_eq!(
            descriptor.parameters.properties["mode"].allowed,
            vec!["fast", "slow"]
        );
    }

    #[test]
    fn test_translate_empty_enum_is_not_an_error() {
        let descriptor = translate(&info(
            "empty_enum",
            json!({
                "type": "object",
                "properties": {
                    "mode": {"type": "string", "enum": []}
                }
            }),
        ))
        .unwrap();
        assert!(descriptor.parameters.properties["mode"].allowed.is_empty());
    }

    #[test]
    fn test_translate_non_string_enum_fails_naming_value() {
        let err = translate(&info(
            "bad_enum",
            json!({
                "type": "object",
                "properties": {
                    "mode": {"type": "string", "enum": ["fast", 42]}
                }
            }),
        ))
        .unwrap_err();
        assert!(matches!(err, BrainError::Schema(_)));
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("mode"));
    }

    #[test]
    fn test_translate_required_without_property_fails() {
        let err = translate(&info(
            "inconsistent",
            json!({
                "type": "object",
                "required": ["ghost"],
                "properties": {}
            }),
        ))
        .unwrap_err();
        assert!(matches!(err, BrainError::Schema(_)));
    }

    #[test]
    fn test_translate_schema_without_properties() {
        let descriptor = translate(&info("bare", json!({"type": "object"}))).unwrap();
        assert!(descriptor.parameters.properties.is_empty());
        assert!(descriptor.parameters.required.is_empty());
    }

    /// Scripted source replaying a fixed sequence of pages keyed by cursor.
    struct PagedSource {
        pages: Vec<(Option<&'static str>, ToolPage)>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl ToolSource for PagedSource {
        async fn list_tools(&self, cursor: Option<&str>) -> crate::Result<ToolPage> {
            if self.fail_on.is_some() && cursor == self.fail_on {
                return Err(BrainError::Backend("page fetch failed".into()));
            }
            self.pages
                .iter()
                .find(|(key, _)| key.as_deref() == cursor)
                .map(|(_, page)| page.clone())
                .ok_or_else(|| BrainError::Backend(format!("unexpected cursor {:?}", cursor)))
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: &Map<String, Value>,
            _cancel: &CancellationToken,
        ) -> crate::Result<String> {
            unimplemented!("not used in pagination tests")
        }
    }

    fn plain(name: &str) -> RemoteToolInfo {
        info(name, json!({"type": "object", "properties": {}}))
    }

    #[tokio::test]
    async fn test_discover_follows_cursors_in_page_order() {
        let source = PagedSource {
            pages: vec![
                (
                    None,
                    ToolPage {
                        tools: vec![plain("t1"), plain("t2")],
                        next_cursor: Some("A".into()),
                    },
                ),
                (
                    Some("A"),
                    ToolPage {
                        tools: vec![plain("t3"), plain("t4")],
                        next_cursor: Some("B".into()),
                    },
                ),
                (
                    Some("B"),
                    ToolPage {
                        tools: vec![plain("t5")],
                        next_cursor: None,
                    },
                ),
            ],
            fail_on: None,
        };

        let descriptors = discover(&source).await.unwrap();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["t1", "t2", "t3", "t4", "t5"]);
    }

    #[tokio::test]
    async fn test_discover_empty_cursor_ends_pagination() {
        let source = PagedSource {
            pages: vec![(
                None,
                ToolPage {
                    tools: vec![plain("only")],
                    next_cursor: Some(String::new()),
                },
            )],
            fail_on: None,
        };
        let descriptors = discover(&source).await.unwrap();
        assert_eq!(descriptors.len(), 1);
    }

    #[tokio::test]
    async fn test_discover_page_error_propagates() {
        let source = PagedSource {
            pages: vec![(
                None,
                ToolPage {
                    tools: vec![plain("first")],
                    next_cursor: Some("A".into()),
                },
            )],
            fail_on: Some("A"),
        };
        let err = discover(&source).await.unwrap_err();
        assert!(matches!(err, BrainError::Backend(_)));
    }

    #[tokio::test]
    async fn test_discover_translation_error_propagates() {
        let source = PagedSource {
            pages: vec![(
                None,
                ToolPage {
                    tools: vec![info(
                        "broken",
                        json!({
                            "type": "object",
                            "properties": {"x": {"enum": [true]}}
                        }),
                    )],
                    next_cursor: None,
                },
            )],
            fail_on: None,
        };
        let err = discover(&source).await.unwrap_err();
        assert!(matches!(err, BrainError::Schema(_)));
    }
}
