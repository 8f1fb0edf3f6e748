//! Line-delimited JSON-RPC 2.0 tool server.
//!
//! One request per line in, one response per line out. Tool calls run in their own
//! task; every response goes through a single writer task so lines never interleave.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use harvest_tools::Toolbox;
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelParams {
    request_id: Value,
}

fn ok(id: Value, result: Value) -> Value { json!({"jsonrpc": "2.0", "id": id, "result": result}) }

fn err(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message.into()}})
}

/// In-flight tool calls by request id (JSON text of the id).
type Inflight = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// Serve requests from `reader` until EOF, then wait for in-flight calls to answer.
/// Returns the writer once everything has been flushed.
pub async fn serve<R, W>(toolbox: Arc<Toolbox>, reader: R, writer: W) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let cap = std::env::var("HARVEST_RPC_QUEUE_CAP").ok().and_then(|s| s.parse::<usize>().ok()).unwrap_or(256);
    let (tx, mut rx) = mpsc::channel::<Value>(cap);
    let out = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(msg) = rx.recv().await {
            let mut line = serde_json::to_vec(&msg)?;
            line.push(b'\n');
            writer.write_all(&line).await?;
            writer.flush().await?;
        }
        Ok::<W, anyhow::Error>(writer)
    });

    let inflight: Inflight = Arc::new(Mutex::new(HashMap::new()));
    let mut reader = reader;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        // Bad bytes get a parse error; the stream keeps going.
        let reply = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handle_line(&toolbox, &inflight, &tx, line.trim()).await,
            Err(e) => Some(err(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))),
        };
        if let Some(reply) = reply {
            if tx.send(reply).await.is_err() {
                warn!("rpc: writer closed");
                break;
            }
        }
    }
    info!("rpc: input closed");
    drop(tx);
    out.await?
}

/// Handle one input line. Returns the immediate reply, if any; tool calls answer later
/// through `tx`.
async fn handle_line(toolbox: &Arc<Toolbox>, inflight: &Inflight, tx: &mpsc::Sender<Value>, line: &str) -> Option<Value> {
    let raw: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(err(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))),
    };
    let req: Request = match serde_json::from_value(raw.clone()) {
        Ok(r) => r,
        Err(e) => {
            let id = raw.get("id").cloned().unwrap_or(Value::Null);
            return Some(err(id, INVALID_REQUEST, format!("Invalid request: {}", e)));
        }
    };
    counter!("rpc_requests_total", 1, "method" => req.method.clone());
    debug!(method = %req.method, id = ?req.id, "rpc: request");
    match (req.method.as_str(), req.id) {
        ("initialize", Some(id)) => Some(ok(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "harvest-mcp", "version": env!("CARGO_PKG_VERSION")}
            }),
        )),
        ("ping", Some(id)) => Some(ok(id, json!({}))),
        ("tools/list", Some(id)) => {
            let tools: Vec<Value> = toolbox
                .specs()
                .iter()
                .map(|s| json!({"name": s.name, "description": s.description, "inputSchema": s.input_schema()}))
                .collect();
            Some(ok(id, json!({ "tools": tools })))
        }
        ("tools/call", Some(id)) => {
            let params: CallParams = match serde_json::from_value(req.params) {
                Ok(p) => p,
                Err(e) => return Some(err(id, INVALID_PARAMS, format!("Invalid params: {}", e))),
            };
            let key = id.to_string();
            let token = CancellationToken::new();
            match inflight.lock().await.entry(key.clone()) {
                Entry::Occupied(_) => return Some(err(id, INVALID_REQUEST, format!("Request id {} is already in flight", key))),
                Entry::Vacant(slot) => {
                    slot.insert(token.clone());
                }
            }
            let toolbox = toolbox.clone();
            let inflight = inflight.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let t0 = Instant::now();
                let args = params.arguments.unwrap_or_default();
                let res = toolbox.call(&params.name, &args, &token).await;
                inflight.lock().await.remove(&key);
                debug!(tool = %params.name, took_ms = %t0.elapsed().as_millis(), "rpc: call answered");
                let result = json!({"content": [{"type": "text", "text": res.text}], "isError": res.is_error});
                if tx.send(ok(id, result)).await.is_err() {
                    warn!(tool = %params.name, "rpc: writer closed before reply");
                }
            });
            None
        }
        ("notifications/cancelled", _) => {
            match serde_json::from_value::<CancelParams>(req.params) {
                Ok(p) => {
                    let key = p.request_id.to_string();
                    match inflight.lock().await.get(&key) {
                        Some(token) => {
                            info!(request = %key, "rpc: cancel in-flight call");
                            token.cancel();
                        }
                        None => debug!(request = %key, "rpc: cancel for unknown request"),
                    }
                }
                Err(e) => debug!(error = %e, "rpc: malformed cancel notification"),
            }
            None
        }
        ("notifications/initialized", _) => None,
        (method, Some(id)) => Some(err(id, METHOD_NOT_FOUND, format!("Method not found: {}", method))),
        (method, None) => {
            debug!(method = %method, "rpc: ignoring notification");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use harvest_core::POD;
    use harvest_kubehub::MockAccess;
    use harvest_tools::ToolSettings;

    async fn run(access: MockAccess, input: &str) -> Vec<Value> {
        run_bytes(access, input.as_bytes()).await
    }

    async fn run_bytes(access: MockAccess, input: &[u8]) -> Vec<Value> {
        let toolbox = Arc::new(Toolbox::with_access(Arc::new(access), ToolSettings::default()));
        let out = serve(toolbox, input, Vec::new()).await.unwrap();
        String::from_utf8(out).unwrap().lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    fn by_id(replies: &[Value], id: i64) -> &Value {
        replies.iter().find(|r| r["id"] == json!(id)).unwrap()
    }

    #[tokio::test]
    async fn handshake_and_listing() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#, "\n",
        );
        let replies = run(MockAccess::new(), input).await;
        assert_eq!(replies.len(), 3);
        assert_eq!(by_id(&replies, 1)["result"]["protocolVersion"], PROTOCOL_VERSION);
        let tools = by_id(&replies, 2)["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), harvest_tools::TOOLS.len());
        assert!(tools.iter().any(|t| t["name"] == "get_vm" && t["inputSchema"]["required"] == json!(["namespace", "name"])));
        assert_eq!(by_id(&replies, 3)["result"], json!({}));
    }

    #[tokio::test]
    async fn protocol_errors_use_standard_codes() {
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"arguments":{}}}"#, "\n",
        );
        let replies = run(MockAccess::new(), input).await;
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(replies[0]["id"], Value::Null);
        assert_eq!(by_id(&replies, 4)["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(by_id(&replies, 5)["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_stop_the_server() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.push(b'\n');
        let replies = run_bytes(MockAccess::new(), &input).await;
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(replies[1]["id"], Value::Null);
        assert_eq!(by_id(&replies, 1)["result"], json!({}));
        assert_eq!(by_id(&replies, 2)["result"], json!({}));
    }

    #[tokio::test]
    async fn reused_in_flight_id_is_rejected() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"list_pods"}}"#, "\n",
            r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"list_vms"}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":8}}"#, "\n",
        );
        let access = MockAccess::new().with_latency(Duration::from_secs(30));
        let replies = tokio::time::timeout(Duration::from_secs(5), run(access, input)).await.unwrap();
        assert_eq!(replies.len(), 2);
        let rejected = replies.iter().find(|r| r.get("error").is_some()).unwrap();
        assert_eq!(rejected["error"]["code"], INVALID_REQUEST);
        let answered = replies.iter().find(|r| r.get("result").is_some()).unwrap();
        assert_eq!(answered["result"]["content"][0]["text"], "Failed to list pods: cancelled");
    }

    #[tokio::test]
    async fn tool_call_returns_text_content() {
        let pod = json!({"kind": "Pod", "metadata": {"name": "web", "namespace": "default"}, "status": {"phase": "Running"}});
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"get_pod","arguments":{"namespace":"default","name":"web"}}}"#, "\n",
            r#"{"jsonrpc":"2.0","id":"b","method":"tools/call","params":{"name":"delete_pod","arguments":{"namespace":"default"}}}"#, "\n",
        );
        let replies = run(MockAccess::new().with_doc(POD, pod), input).await;
        let a = replies.iter().find(|r| r["id"] == "a").unwrap();
        assert_eq!(a["result"]["isError"], false);
        assert!(a["result"]["content"][0]["text"].as_str().unwrap().starts_with("Pod: web"));
        let b = replies.iter().find(|r| r["id"] == "b").unwrap();
        assert_eq!(b["result"]["isError"], true);
        assert_eq!(b["result"]["content"][0]["text"], "Pod name is required");
    }

    #[tokio::test]
    async fn cancel_notification_stops_the_call() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"list_pods"}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":7}}"#, "\n",
        );
        let access = MockAccess::new().with_latency(Duration::from_secs(30));
        let replies = tokio::time::timeout(Duration::from_secs(5), run(access, input)).await.unwrap();
        let r = by_id(&replies, 7);
        assert_eq!(r["result"]["isError"], true);
        assert_eq!(r["result"]["content"][0]["text"], "Failed to list pods: cancelled");
    }
}
