/// JSON-RPC 2.0 types for the editor bridge (newline-delimited over stdio)
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const SERVER_NOT_INITIALIZED: i32 = -32002;
pub const SNIPPET_NOT_ADDED: i32 = -32000;

// ─── JSON-RPC Envelope ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Server → host message that expects no reply.
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification<P> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: P,
}

impl<P: Serialize> JsonRpcNotification<P> {
    pub fn new(method: &'static str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

// ─── Initialize ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ClientInfo {
    /// Editor display name, e.g. "Visual Studio Code - Insiders"
    pub name: String,
}

// ─── Snippets ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PathParams {
    pub language: String,
}

// ─── Messages shown to the user ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Error,
    Info,
}

impl Serialize for MessageType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            Self::Error => 1,
            Self::Info => 3,
        })
    }
}

/// Params of `window/showMessage`.
#[derive(Debug, Serialize)]
pub struct ShowMessageParams<'a> {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_show_message_wire_format() {
        let note = JsonRpcNotification::new(
            "window/showMessage",
            ShowMessageParams {
                kind: MessageType::Error,
                message: "boom",
            },
        );
        assert_eq!(
            serde_json::to_value(&note).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "window/showMessage",
                "params": { "type": 1, "message": "boom" }
            })
        );
    }

    #[test]
    fn test_initialize_params_client_info() {
        let params: InitializeParams = serde_json::from_value(json!({
            "clientInfo": { "name": "Visual Studio Code", "version": "1.90" }
        }))
        .unwrap();
        assert_eq!(params.client_info.unwrap().name, "Visual Studio Code");

        let params: InitializeParams = serde_json::from_value(json!({})).unwrap();
        assert!(params.client_info.is_none());
    }
}
