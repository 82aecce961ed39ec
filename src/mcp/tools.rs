//! Tool definitions, argument parsing and text rendering for `tools/call`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::documents::{parse_tags, Document, DocumentCreate};
use crate::semantic::RankedResult;

pub const ADD_MEMORY: &str = "add_memory";
pub const SEARCH_MEMORIES: &str = "search_memories";
pub const LIST_MEMORIES: &str = "list_memories";
pub const DELETE_MEMORY: &str = "delete_memory";

const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub fn tool_definitions(default_limit: usize, default_threshold: f32) -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: ADD_MEMORY,
            description: "Add a new memory document to the store",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {"type": "string", "description": "The memory content"},
                    "tags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Tags for categorization"
                    },
                    "favorite": {"type": "boolean", "description": "Mark as favorite document"},
                    "properties": {"type": "object", "description": "Additional key-value properties"}
                },
                "required": ["content"]
            }),
        },
        ToolDefinition {
            name: SEARCH_MEMORIES,
            description: "Search for memory documents based on query",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query"},
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": default_limit
                    },
                    "threshold": {
                        "type": "number",
                        "description": "Similarity threshold (0.0-1.0)",
                        "default": default_threshold
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: LIST_MEMORIES,
            description: "List all memory documents",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: DELETE_MEMORY,
            description: "Delete a memory document by ID",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Document ID to delete"}
                },
                "required": ["id"]
            }),
        },
    ]
}

/// Argument validation failure; maps to -32602.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0}")]
pub struct ArgumentError(pub String);

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ArgumentError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ArgumentError(format!("Missing {key}")))
}

pub fn add_arguments(args: &Map<String, Value>) -> Result<DocumentCreate, ArgumentError> {
    let content = required_str(args, "content")?.to_string();

    let tags = match args.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(tags)) => parse_tags(tags),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(_) => return Err(ArgumentError("tags must be an array of strings".to_string())),
    };

    let favorite = match args.get("favorite") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(favorite)) => *favorite,
        Some(_) => return Err(ArgumentError("favorite must be a boolean".to_string())),
    };

    // non-string property values are skipped
    let properties: BTreeMap<String, String> = match args.get("properties") {
        Some(Value::Object(props)) => props
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_str()
                    .map(|value| (key.clone(), value.to_string()))
            })
            .collect(),
        _ => BTreeMap::new(),
    };

    Ok(DocumentCreate {
        content,
        tags,
        properties,
        favorite,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchArguments {
    pub query: String,
    pub limit: usize,
    pub threshold: f32,
}

pub fn search_arguments(
    args: &Map<String, Value>,
    default_limit: usize,
    default_threshold: f32,
) -> Result<SearchArguments, ArgumentError> {
    let query = required_str(args, "query")?.to_string();

    let limit = match args.get("limit") {
        None | Some(Value::Null) => default_limit,
        Some(value) => {
            let limit = value
                .as_i64()
                .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| ArgumentError("limit must be an integer".to_string()))?;
            if limit <= 0 {
                return Err(ArgumentError(format!(
                    "limit must be greater than zero, got {limit}"
                )));
            }
            limit as usize
        }
    };

    let threshold = match args.get("threshold") {
        None | Some(Value::Null) => default_threshold,
        Some(value) => {
            let threshold = value
                .as_f64()
                .ok_or_else(|| ArgumentError("threshold must be a number".to_string()))?;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ArgumentError(format!(
                    "threshold must be within [0, 1], got {threshold}"
                )));
            }
            threshold as f32
        }
    };

    Ok(SearchArguments {
        query,
        limit,
        threshold,
    })
}

pub fn delete_arguments(args: &Map<String, Value>) -> Result<String, ArgumentError> {
    Ok(required_str(args, "id")?.to_string())
}

fn render_document(position: usize, doc: &Document) -> String {
    let favorite = if doc.favorite { " ⭐" } else { "" };
    format!(
        "{position}. [{}]{favorite}\nContent: {}\nTags: {}\nCreated: {}\n",
        doc.id,
        doc.content,
        doc.tags.join(", "),
        doc.created_at.format(CREATED_FORMAT),
    )
}

pub fn render_search(results: &[RankedResult]) -> String {
    let entries: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let mut entry = render_document(i + 1, &result.document);
            if result.document.favorite {
                entry.push_str(&format!(
                    "Score: {:.3} (boosted {:.3})\n",
                    result.score, result.boosted_score
                ));
            } else {
                entry.push_str(&format!("Score: {:.3}\n", result.score));
            }
            entry
        })
        .collect();

    format!("Found {} memories:\n\n{}", results.len(), entries.join("\n"))
}

pub fn render_list(documents: &[Document]) -> String {
    let entries: Vec<String> = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| render_document(i + 1, doc))
        .collect();

    format!("Total {} memories:\n\n{}", documents.len(), entries.join("\n"))
}

/// Wrap text in an MCP tool result.
pub fn text_content(text: impl Into<String>) -> Value {
    json!({
        "content": [{"type": "text", "text": text.into()}]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_definitions() {
        let tools = tool_definitions(10, 0.1);
        let names: Vec<&str> = tools.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![ADD_MEMORY, SEARCH_MEMORIES, LIST_MEMORIES, DELETE_MEMORY]
        );
        let value = serde_json::to_value(&tools[1]).unwrap();
        assert_eq!(value["inputSchema"]["required"][0], "query");
        assert_eq!(value["inputSchema"]["properties"]["limit"]["default"], 10);
    }

    #[test]
    fn test_add_arguments() {
        let create = add_arguments(&args(json!({
            "content": "hello",
            "tags": ["a", 3, "b"],
            "favorite": true,
            "properties": {"source": "chat", "n": 1}
        })))
        .unwrap();

        assert_eq!(create.content, "hello");
        assert_eq!(create.tags, vec!["a", "b"]);
        assert!(create.favorite);
        assert_eq!(create.properties.len(), 1);
        assert_eq!(create.properties["source"], "chat");
    }

    #[test]
    fn test_add_requires_content() {
        assert!(add_arguments(&args(json!({"tags": ["a"]}))).is_err());
        assert!(add_arguments(&args(json!({"content": 5}))).is_err());
    }

    #[test]
    fn test_search_defaults() {
        let parsed = search_arguments(&args(json!({"query": "rust"})), 10, 0.1).unwrap();
        assert_eq!(
            parsed,
            SearchArguments {
                query: "rust".to_string(),
                limit: 10,
                threshold: 0.1
            }
        );
    }

    #[test]
    fn test_search_rejects_bad_values() {
        for bad in [
            json!({"query": "q", "limit": 0}),
            json!({"query": "q", "limit": -3}),
            json!({"query": "q", "limit": "ten"}),
            json!({"query": "q", "threshold": 1.5}),
            json!({"query": "q", "threshold": -0.1}),
            json!({"limit": 5}),
        ] {
            assert!(search_arguments(&args(bad.clone()), 10, 0.1).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_render_list() {
        let doc = Document {
            id: "abc".into(),
            content: "note".to_string(),
            tags: vec!["x".to_string(), "y".to_string()],
            properties: BTreeMap::new(),
            favorite: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        let text = render_list(&[doc]);
        assert_eq!(
            text,
            "Total 1 memories:\n\n1. [abc] ⭐\nContent: note\nTags: x, y\nCreated: 2024-01-02 03:04:05\n"
        );
    }

    #[test]
    fn test_render_search_includes_scores() {
        let doc = Document {
            id: "abc".into(),
            content: "note".to_string(),
            tags: vec![],
            properties: BTreeMap::new(),
            favorite: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };
        let text = render_search(&[RankedResult {
            document: doc,
            score: 0.5,
            boosted_score: 0.5,
        }]);
        assert!(text.starts_with("Found 1 memories:\n\n1. [abc]\n"));
        assert!(text.ends_with("Score: 0.500\n"));
    }
}
