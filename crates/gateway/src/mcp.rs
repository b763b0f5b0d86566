//! MCP server: the inbox operations as tools for an assistant host.
//!
//! One dispatcher serves both `POST /mcp` and the stdio transport
//! (newline-delimited JSON-RPC). Tool failures are reported in the tool
//! result with `isError`; only protocol faults become JSON-RPC errors.

use std::sync::Arc;

use {
    chatnest_assist::DraftRequest,
    chatnest_common::MessageScope,
    chatnest_inbox::{InboxService, ReplyRequest, SummarizeRequest, SummarizeThreadRequest},
    chatnest_protocol::mcp::{
        InitializeResult, JsonRpcRequest, JsonRpcResponse, McpToolDef, ToolsCallParams,
        ToolsCallResult, ToolsListResult, methods, rpc_codes,
    },
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    serde_json::{Value, json},
    tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    tracing::{debug, info, warn},
};

#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    Arguments(String),

    #[error(transparent)]
    Inbox(#[from] chatnest_inbox::Error),
}

type RpcResult = Result<Value, (i64, String)>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListArgs {
    platform: Option<String>,
    limit: Option<usize>,
    /// Read the store without contacting providers.
    cached: bool,
}

#[derive(Debug, Deserialize)]
struct MarkReadArgs {
    message_id: String,
}

pub struct McpDispatcher {
    inbox: Arc<InboxService>,
    version: String,
}

impl McpDispatcher {
    pub fn new(inbox: Arc<InboxService>, version: &str) -> Self {
        Self {
            inbox,
            version: version.to_string(),
        }
    }

    /// Handle one request. Notifications get no response.
    pub async fn handle(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let result = if req.jsonrpc != "2.0" {
            Err((
                rpc_codes::INVALID_REQUEST,
                format!("unsupported jsonrpc version: {}", req.jsonrpc),
            ))
        } else {
            match req.method.as_str() {
                methods::INITIALIZE => encode(&InitializeResult::new(&self.version)),
                methods::PING => Ok(json!({})),
                methods::TOOLS_LIST => encode(&ToolsListResult { tools: tool_defs() }),
                methods::TOOLS_CALL => self.call_tool(req.params).await,
                m if req.id.is_none() => {
                    debug!(method = m, "mcp: notification");
                    return None;
                },
                other => Err((
                    rpc_codes::METHOD_NOT_FOUND,
                    format!("unknown method: {other}"),
                )),
            }
        };
        let id = req.id?;
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err((code, message)) => JsonRpcResponse::failure(id, code, message),
        })
    }

    /// Handle one raw JSON-RPC message, returning the serialized response.
    pub async fn handle_text(&self, text: &str) -> Option<String> {
        let response = match serde_json::from_str::<JsonRpcRequest>(text) {
            Ok(req) => self.handle(req).await?,
            Err(e) => JsonRpcResponse::failure(
                Value::Null,
                rpc_codes::PARSE_ERROR,
                format!("parse error: {e}"),
            ),
        };
        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "mcp: unserializable response");
                None
            },
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> RpcResult {
        let params: ToolsCallParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| (rpc_codes::INVALID_PARAMS, e.to_string()))?;
        let result = match self.run_tool(&params.name, params.arguments).await {
            Ok(value) => ToolsCallResult::json(&value),
            Err(ToolError::UnknownTool(name)) => {
                return Err((rpc_codes::INVALID_PARAMS, format!("unknown tool: {name}")));
            },
            Err(e) => {
                debug!(tool = %params.name, error = %e, "mcp: tool failed");
                ToolsCallResult::error(e.to_string())
            },
        };
        encode(&result)
    }

    async fn run_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let inbox = &self.inbox;
        let value = match name {
            "inbox_status" => to_value(&inbox.status()),
            "list_messages" => {
                let args: ListArgs = parse_args(arguments)?;
                let scope = MessageScope::parse(args.platform.as_deref())
                    .map_err(chatnest_inbox::Error::from)?;
                let messages = if args.cached {
                    inbox.cached_messages(scope, args.limit)?
                } else {
                    inbox.list_messages(scope, args.limit).await?
                };
                json!({ "count": messages.len(), "messages": messages })
            },
            "mark_read" => {
                let args: MarkReadArgs = parse_args(arguments)?;
                let changed = inbox.mark_read(&args.message_id).await?;
                json!({ "success": true, "changed": changed })
            },
            "send_reply" => to_value(&inbox.send_reply(parse_args::<ReplyRequest>(arguments)?).await?),
            "summarize_message" => {
                to_value(&inbox.summarize(parse_args::<SummarizeRequest>(arguments)?).await?)
            },
            "summarize_thread" => to_value(
                &inbox
                    .summarize_thread(parse_args::<SummarizeThreadRequest>(arguments)?)
                    .await?,
            ),
            "draft_reply" => {
                to_value(&inbox.draft_reply(parse_args::<DraftRequest>(arguments)?).await?)
            },
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(value)
    }
}

fn encode<T: Serialize>(value: &T) -> RpcResult {
    serde_json::to_value(value).map_err(|e| (rpc_codes::INTERNAL_ERROR, e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Missing arguments count as an empty object.
fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::Arguments(e.to_string()))
}

fn tool(name: &str, description: &str, input_schema: Value) -> McpToolDef {
    McpToolDef {
        name: name.into(),
        description: Some(description.into()),
        input_schema,
    }
}

pub fn tool_defs() -> Vec<McpToolDef> {
    let platform = json!({ "type": "string", "enum": ["gmail", "slack", "telegram"] });
    let message_id = json!({
        "type": "string",
        "description": "Platform-qualified id, e.g. gmail:18c2f or slack:general:1705744800.000100"
    });
    vec![
        tool(
            "inbox_status",
            "Connection state and unread counts per platform.",
            json!({ "type": "object", "properties": {} }),
        ),
        tool(
            "list_messages",
            "Fetch recent messages, newest first.",
            json!({
                "type": "object",
                "properties": {
                    "platform": platform,
                    "limit": { "type": "integer", "minimum": 1, "maximum": 500 },
                    "cached": { "type": "boolean", "description": "Skip fetching; return stored messages" }
                }
            }),
        ),
        tool(
            "mark_read",
            "Mark a message read. Repeating the call is harmless.",
            json!({
                "type": "object",
                "properties": { "message_id": message_id },
                "required": ["message_id"]
            }),
        ),
        tool(
            "send_reply",
            "Reply to a message on its own platform and mark it read.",
            json!({
                "type": "object",
                "properties": {
                    "message_id": message_id,
                    "body": { "type": "string" },
                    "use_ai_draft": { "type": "boolean" },
                    "original_body": { "type": "string" },
                    "subject": { "type": "string" },
                    "recipient": { "type": "string" },
                    "channel": { "type": "string" },
                    "chat_id": { "type": "string" },
                    "thread_id": { "type": "string" }
                },
                "required": ["message_id"]
            }),
        ),
        tool(
            "summarize_message",
            "Summarize a stored message or the given body.",
            json!({
                "type": "object",
                "properties": {
                    "message_id": message_id,
                    "body": { "type": "string" },
                    "platform": platform,
                    "sender": { "type": "string" }
                }
            }),
        ),
        tool(
            "summarize_thread",
            "Summarize a fetched email thread, Slack thread or Telegram chat as a whole.",
            json!({
                "type": "object",
                "properties": {
                    "thread_id": {
                        "type": "string",
                        "description": "thread_id of any message in the thread"
                    },
                    "limit": { "type": "integer", "minimum": 1, "maximum": 500 }
                },
                "required": ["thread_id"]
            }),
        ),
        tool(
            "draft_reply",
            "Draft a reply without sending it.",
            json!({
                "type": "object",
                "properties": {
                    "original_body": { "type": "string" },
                    "platform": platform,
                    "sender": { "type": "string" },
                    "instructions": { "type": "string" }
                },
                "required": ["original_body"]
            }),
        ),
    ]
}

/// Serve newline-delimited JSON-RPC from `reader` to `writer` until EOF.
pub async fn serve_lines<R, W>(dispatcher: &McpDispatcher, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = dispatcher.handle_text(&line).await {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    info!("mcp: input closed");
    Ok(())
}

/// Serve MCP over the process's stdin and stdout.
pub async fn serve_stdio(dispatcher: &McpDispatcher) -> anyhow::Result<()> {
    info!("mcp: serving on stdio");
    serve_lines(dispatcher, tokio::io::stdin(), tokio::io::stdout()).await
}
