use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Map, Value};

use super::protocol::{
    error_codes, methods, JsonRpcId, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION,
};
use super::tools::{self, ArgumentError};
use crate::app::{AppError, MemoryService};

/// Failure of a single `tools/call`, already classified by JSON-RPC code.
#[derive(Debug)]
struct CallError {
    code: i32,
    message: String,
}

impl From<ArgumentError> for CallError {
    fn from(err: ArgumentError) -> Self {
        CallError {
            code: error_codes::INVALID_PARAMS,
            message: err.0,
        }
    }
}

impl CallError {
    fn service(action: &str, err: AppError) -> Self {
        log::error!("{action} failed: {err}");
        let code = match err {
            AppError::InvalidParameter(_) => error_codes::INVALID_PARAMS,
            _ => error_codes::INTERNAL_ERROR,
        };
        CallError {
            code,
            message: format!("{action} failed: {err}"),
        }
    }
}

/// Line-delimited JSON-RPC server exposing the memory tools.
pub struct McpServer {
    service: Arc<MemoryService>,
}

impl McpServer {
    pub fn new(service: Arc<MemoryService>) -> Self {
        Self { service }
    }

    pub fn run_stdio(&self) -> anyhow::Result<()> {
        log::info!("MCP server listening on stdio");
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.serve(stdin.lock(), stdout.lock())
    }

    /// Serve requests until `reader` reaches EOF.
    pub fn serve<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> anyhow::Result<()> {
        for line in reader.lines() {
            let line = line.context("failed to read request")?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            log::debug!("Received request ({} bytes)", trimmed.len());

            if let Some(response) = self.handle_line(trimmed) {
                let encoded = serde_json::to_string(&response)?;
                writeln!(writer, "{encoded}").context("failed to write response")?;
                writer.flush().context("failed to flush response")?;
            }
        }

        log::info!("Input closed, MCP server shutting down");
        Ok(())
    }

    /// Handle one raw request line. Notifications produce no response.
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Unparsable request: {err}");
                return Some(JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {err}"),
                ));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(err) => {
                return Some(JsonRpcResponse::error(
                    None,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {err}"),
                ));
            }
        };

        self.handle_request(request)
    }

    fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        log::debug!("Handling method {}", request.method);

        let id = request.id.clone();
        match request.method.as_str() {
            methods::INITIALIZE => Some(JsonRpcResponse::success(id, self.initialize())),
            methods::INITIALIZED => None,
            methods::TOOLS_LIST => Some(JsonRpcResponse::success(id, self.tools_list())),
            methods::TOOLS_CALL => Some(self.tools_call(id, request.params)),
            _ if request.id.is_none() => None,
            other => Some(JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }
        })
    }

    fn tools_list(&self) -> Value {
        let search = self.service.search_config();
        json!({
            "tools": tools::tool_definitions(search.default_limit, search.default_threshold)
        })
    }

    fn tools_call(&self, id: Option<JsonRpcId>, params: Option<Value>) -> JsonRpcResponse {
        let Some(Value::Object(params)) = params else {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Invalid params");
        };

        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing tool name");
        };

        let arguments = match params.get("arguments") {
            Some(Value::Object(arguments)) => arguments.clone(),
            _ => Map::new(),
        };

        let outcome = match name {
            tools::ADD_MEMORY => self.add_memory(&arguments),
            tools::SEARCH_MEMORIES => self.search_memories(&arguments),
            tools::LIST_MEMORIES => self.list_memories(),
            tools::DELETE_MEMORY => self.delete_memory(&arguments),
            other => Err(CallError {
                code: error_codes::METHOD_NOT_FOUND,
                message: format!("Unknown tool: {other}"),
            }),
        };

        match outcome {
            Ok(text) => JsonRpcResponse::success(id, tools::text_content(text)),
            Err(err) => JsonRpcResponse::error(id, err.code, err.message),
        }
    }

    fn add_memory(&self, args: &Map<String, Value>) -> Result<String, CallError> {
        let create = tools::add_arguments(args)?;
        let doc = self
            .service
            .add(create)
            .map_err(|err| CallError::service("Add", err))?;
        Ok(format!("Memory added successfully with ID: {}", doc.id))
    }

    fn search_memories(&self, args: &Map<String, Value>) -> Result<String, CallError> {
        let search = self.service.search_config();
        let parsed = tools::search_arguments(args, search.default_limit, search.default_threshold)?;
        let results = self
            .service
            .search(&parsed.query, parsed.limit, parsed.threshold)
            .map_err(|err| CallError::service("Search", err))?;
        Ok(tools::render_search(&results))
    }

    fn list_memories(&self) -> Result<String, CallError> {
        let documents = self
            .service
            .list()
            .map_err(|err| CallError::service("List", err))?;
        Ok(tools::render_list(&documents))
    }

    fn delete_memory(&self, args: &Map<String, Value>) -> Result<String, CallError> {
        let id = tools::delete_arguments(args)?;
        self.service
            .delete(&id)
            .map_err(|err| CallError::service("Delete", err))?;
        Ok(format!("Memory with ID {id} deleted successfully"))
    }
}
