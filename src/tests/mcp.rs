use std::io::Cursor;

use serde_json::{json, Value};

use super::volatile_service;
use crate::mcp::McpServer;

fn run(server: &McpServer, requests: &[Value]) -> Vec<Value> {
    let input: String = requests
        .iter()
        .map(|r| format!("{r}\n\n"))
        .collect();

    let mut output = Vec::new();
    server.serve(Cursor::new(input), &mut output).unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn call(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

fn text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

#[test]
fn test_handshake() {
    let server = McpServer::new(volatile_service());
    let responses = run(
        &server,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        ],
    );

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "memo");

    let tools: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        tools,
        vec!["add_memory", "search_memories", "list_memories", "delete_memory"]
    );
}

#[test]
fn test_tool_round_trip() {
    let service = volatile_service();
    let server = McpServer::new(service.clone());

    let responses = run(
        &server,
        &[
            call(
                1,
                "add_memory",
                json!({"content": "Prefer rustls over openssl", "tags": ["rust", "tls"], "favorite": true}),
            ),
            call(2, "add_memory", json!({"content": "Water the plants on Sunday"})),
        ],
    );
    let added = text(&responses[0]);
    assert!(added.starts_with("Memory added successfully with ID: "));
    let id = added.trim_start_matches("Memory added successfully with ID: ").to_string();

    let responses = run(
        &server,
        &[
            call(3, "search_memories", json!({"query": "rustls openssl", "limit": 1})),
            call(4, "list_memories", json!({})),
            call(5, "delete_memory", json!({"id": id})),
            call(6, "list_memories", json!({})),
        ],
    );

    let found = text(&responses[0]);
    assert!(found.starts_with("Found 1 memories:"));
    assert!(found.contains(&format!("1. [{id}] ⭐")));
    assert!(found.contains("Tags: rust, tls"));
    assert!(found.contains("Score: "));

    assert!(text(&responses[1]).starts_with("Total 2 memories:"));
    assert_eq!(
        text(&responses[2]),
        format!("Memory with ID {id} deleted successfully")
    );
    assert!(text(&responses[3]).starts_with("Total 1 memories:"));
    assert_eq!(service.stats().total_documents, 1);
}

#[test]
fn test_error_codes() {
    let server = McpServer::new(volatile_service());

    let mut output = Vec::new();
    server
        .serve(Cursor::new("{not json\n"), &mut output)
        .unwrap();
    let parse_error: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parse_error["error"]["code"], -32700);
    assert!(parse_error["id"].is_null());

    let responses = run(
        &server,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}),
            call(2, "search_memories", json!({"query": "x", "limit": 0})),
            call(3, "search_memories", json!({"query": "x", "threshold": 1.5})),
            call(4, "add_memory", json!({})),
            call(5, "no_such_tool", json!({})),
            call(6, "delete_memory", json!({"id": "missing"})),
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call"}),
            json!({"id": 8}),
        ],
    );

    let codes: Vec<i64> = responses
        .iter()
        .map(|r| r["error"]["code"].as_i64().unwrap())
        .collect();
    assert_eq!(
        codes,
        vec![-32601, -32602, -32602, -32602, -32601, -32603, -32602, -32600]
    );
    assert_eq!(responses[1]["id"], 2);
}
